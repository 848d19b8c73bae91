use crate::error::{PlotError, Result};
use csv::ReaderBuilder;
use serde::Serialize;
use std::cmp::Ordering;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Cell contents treated as missing when reading CSV.
const MISSING_TOKENS: [&str; 2] = ["", "NA"];

/// A single typed column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Column {
    Numeric {
        values: Vec<Option<f64>>,
    },
    Categorical {
        values: Vec<Option<String>>,
        /// Distinct labels in display order
        levels: Vec<String>,
    },
}

impl Column {
    /// Numeric column; NaN and infinite values are stored as missing.
    pub fn numeric(values: Vec<Option<f64>>) -> Self {
        let values = values.into_iter().map(|v| v.and_then(finite)).collect();
        Column::Numeric { values }
    }

    /// Categorical column with levels in lexical order.
    pub fn categorical(values: Vec<Option<String>>) -> Self {
        let mut levels: Vec<String> = values.iter().flatten().cloned().collect();
        levels.sort();
        levels.dedup();
        Column::Categorical { values, levels }
    }

    /// Infer the column type from raw CSV cells: numeric when every
    /// non-missing cell parses as a number and at least one is present.
    pub fn from_raw(cells: Vec<String>) -> Self {
        let cleaned: Vec<Option<String>> = cells
            .into_iter()
            .map(|c| {
                let trimmed = c.trim();
                if MISSING_TOKENS.contains(&trimmed) {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect();

        let parsed: Vec<Option<Option<f64>>> = cleaned
            .iter()
            .map(|c| match c {
                None => Some(None),
                Some(s) => s.parse::<f64>().ok().map(Some),
            })
            .collect();

        let all_numeric = parsed.iter().all(|p| p.is_some());
        let any_present = cleaned.iter().any(|c| c.is_some());

        if all_numeric && any_present {
            Column::numeric(parsed.into_iter().flatten().collect())
        } else {
            Column::categorical(cleaned)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numeric { values } => values.len(),
            Column::Categorical { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Column::Numeric { .. })
    }

    /// Number of distinct non-missing values.
    pub fn cardinality(&self) -> usize {
        match self {
            Column::Numeric { .. } => numeric_levels(self).len(),
            Column::Categorical { levels, .. } => levels.len(),
        }
    }

    pub fn levels(&self) -> Option<&[String]> {
        match self {
            Column::Categorical { levels, .. } => Some(levels),
            Column::Numeric { .. } => None,
        }
    }

    pub fn numeric_value(&self, row: usize) -> Option<f64> {
        match self {
            Column::Numeric { values } => values.get(row).copied().flatten().and_then(finite),
            Column::Categorical { .. } => None,
        }
    }

    /// The row's value as a label; numbers use the same formatting as
    /// categorical conversion so lookups against levels line up.
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            Column::Numeric { .. } => self.numeric_value(row).map(format_number),
            Column::Categorical { values, .. } => values.get(row).cloned().flatten(),
        }
    }

    /// Convert to a categorical column. Numeric levels are ordered by value,
    /// not lexically, so 4 < 6 < 10.
    pub fn to_categorical(&self) -> Column {
        match self {
            Column::Categorical { .. } => self.clone(),
            Column::Numeric { values } => {
                let levels = numeric_levels(self).into_iter().map(format_number).collect();
                let values = values
                    .iter()
                    .map(|v| v.and_then(finite).map(format_number))
                    .collect();
                Column::Categorical { values, levels }
            }
        }
    }
}

fn numeric_levels(column: &Column) -> Vec<f64> {
    let Column::Numeric { values } = column else {
        return Vec::new();
    };
    let mut distinct: Vec<f64> = values.iter().flatten().copied().filter_map(finite).collect();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    distinct.dedup();
    distinct
}

/// Drops NaN and infinities and folds -0 into 0, so every present value
/// has exactly one label.
fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value + 0.0)
}

/// Whole numbers print without a fractional part ("4", not "4.0").
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// A table of named, equal-length columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    names: Vec<String>,
    columns: Vec<Column>,
    n_rows: usize,
    /// Transient grouping annotation left by an upstream step
    #[serde(skip_serializing_if = "Vec::is_empty")]
    grouping: Vec<String>,
}

impl Dataset {
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(PlotError::NotADataset("no columns".to_string()));
        }

        let n_rows = columns[0].1.len();
        if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != n_rows) {
            return Err(PlotError::NotADataset(format!(
                "column '{}' has {} rows, expected {}",
                name,
                col.len(),
                n_rows
            )));
        }

        let (names, columns): (Vec<String>, Vec<Column>) = columns.into_iter().unzip();
        Ok(Dataset {
            names,
            columns,
            n_rows,
            grouping: Vec::new(),
        })
    }

    /// Parse CSV with a header row and at least one data row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| PlotError::NotADataset(format!("failed to read CSV headers: {}", e)))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(PlotError::NotADataset("CSV has no header row".to_string()));
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for result in reader.records() {
            let record = result
                .map_err(|e| PlotError::NotADataset(format!("failed to read CSV record: {}", e)))?;
            for (idx, value) in record.iter().enumerate() {
                cells[idx].push(value.to_string());
            }
        }

        if cells[0].is_empty() {
            return Err(PlotError::NotADataset(
                "CSV must contain at least one data row".to_string(),
            ));
        }

        Dataset::from_columns(
            headers
                .into_iter()
                .zip(cells)
                .map(|(name, raw)| (name, Column::from_raw(raw)))
                .collect(),
        )
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PlotError::NotADataset(format!("cannot open '{}': {}", path.display(), e))
        })?;
        Dataset::from_reader(file)
    }

    pub fn from_stdin() -> Result<Self> {
        Dataset::from_reader(io::stdin())
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
    }

    /// `None` when the column does not exist.
    pub fn is_numeric(&self, name: &str) -> Option<bool> {
        self.column(name).map(Column::is_numeric)
    }

    /// Replace a column in place with its categorical form.
    /// Returns false when the column does not exist.
    pub fn convert_to_categorical(&mut self, name: &str) -> bool {
        match self.names.iter().position(|n| n == name) {
            Some(idx) => {
                self.columns[idx] = self.columns[idx].to_categorical();
                true
            }
            None => false,
        }
    }

    /// Attach a grouping annotation, as an upstream grouping step would.
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grouping = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn grouping(&self) -> &[String] {
        &self.grouping
    }

    pub fn is_grouped(&self) -> bool {
        !self.grouping.is_empty()
    }

    pub fn ungroup(&mut self) {
        self.grouping.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn csv_from_string(content: &str) -> Result<Dataset> {
        Dataset::from_reader(Cursor::new(content))
    }

    #[test]
    fn test_read_csv_basic() {
        let data = csv_from_string("a,b,c\n1,2,3\n4,5,6").unwrap();
        assert_eq!(data.column_names(), &["a", "b", "c"]);
        assert_eq!(data.n_rows(), 2);
        assert_eq!(data.column("b").unwrap().numeric_value(1), Some(5.0));
    }

    #[test]
    fn test_read_csv_infers_types() {
        let data = csv_from_string("model,mpg\nFiat,32.4\nValiant,18.1").unwrap();
        assert_eq!(data.is_numeric("model"), Some(false));
        assert_eq!(data.is_numeric("mpg"), Some(true));
        assert_eq!(data.is_numeric("hp"), None);
    }

    #[test]
    fn test_read_csv_missing_values_stay_numeric() {
        let data = csv_from_string("x,y\n1,10\n2,\n3,NA").unwrap();
        let y = data.column("y").unwrap();
        assert!(y.is_numeric());
        assert_eq!(y.numeric_value(0), Some(10.0));
        assert_eq!(y.numeric_value(1), None);
        assert_eq!(y.numeric_value(2), None);
        assert_eq!(y.cardinality(), 1);
    }

    #[test]
    fn test_non_finite_and_signed_zero_labels() {
        let data = csv_from_string("x,y\n1,NaN\n2,-0\n3,0\n4,inf\n5,2").unwrap();
        let y = data.column("y").unwrap();
        assert!(y.is_numeric());
        assert_eq!(y.numeric_value(0), None);
        assert_eq!(y.numeric_value(3), None);
        assert_eq!(y.cardinality(), 2);

        let categorical = y.to_categorical();
        assert_eq!(categorical.levels().unwrap(), &["0", "2"]);
        let levels = categorical.levels().unwrap();
        for row in 0..data.n_rows() {
            if let Some(label) = categorical.label(row) {
                assert!(levels.contains(&label), "{} has no level", label);
            }
            assert_eq!(y.label(row), categorical.label(row));
        }
        assert_eq!(categorical.label(0), None);
        assert_eq!(categorical.label(1).as_deref(), Some("0"));
    }

    #[test]
    fn test_read_csv_all_missing_is_categorical() {
        let data = csv_from_string("x,y\n1,\n2,").unwrap();
        assert_eq!(data.is_numeric("y"), Some(false));
        assert_eq!(data.column("y").unwrap().cardinality(), 0);
    }

    #[test]
    fn test_read_csv_empty_data() {
        let result = csv_from_string("x,y\n");
        assert!(matches!(result, Err(PlotError::NotADataset(_))));
        assert!(result.unwrap_err().to_string().contains("at least one data row"));
    }

    #[test]
    fn test_read_csv_short_row() {
        let result = csv_from_string("x,y,z\n1,10,100\n2,20");
        assert!(matches!(result, Err(PlotError::NotADataset(_))));
        assert!(result.unwrap_err().to_string().contains("record"));
    }

    #[test]
    fn test_read_csv_unicode() {
        let data = csv_from_string("x,température\n1,20.5\n2,22.0").unwrap();
        assert!(data.column("température").is_some());
    }

    #[test]
    fn test_column_lookup_is_case_sensitive() {
        let data = csv_from_string("Temperature,humidity\n20.5,60").unwrap();
        assert!(data.column("Temperature").is_some());
        assert!(data.column("temperature").is_none());
    }

    #[test]
    fn test_from_columns_rejects_ragged() {
        let result = Dataset::from_columns(vec![
            ("a".to_string(), Column::numeric(vec![Some(1.0), Some(2.0)])),
            ("b".to_string(), Column::numeric(vec![Some(1.0)])),
        ]);
        assert!(matches!(result, Err(PlotError::NotADataset(_))));
    }

    #[test]
    fn test_from_columns_rejects_empty() {
        assert!(matches!(
            Dataset::from_columns(vec![]),
            Err(PlotError::NotADataset(_))
        ));
    }

    #[test]
    fn test_categorical_levels_sorted() {
        let col = Column::categorical(vec![
            Some("b".to_string()),
            Some("a".to_string()),
            None,
            Some("b".to_string()),
        ]);
        assert_eq!(col.levels().unwrap(), &["a", "b"]);
        assert_eq!(col.cardinality(), 2);
    }

    #[test]
    fn test_to_categorical_orders_numerically() {
        let col = Column::numeric(vec![Some(10.0), Some(4.0), Some(6.0), Some(4.0), None]);
        assert_eq!(col.cardinality(), 3);

        let cat = col.to_categorical();
        assert!(!cat.is_numeric());
        assert_eq!(cat.levels().unwrap(), &["4", "6", "10"]);
        assert_eq!(cat.label(0), Some("10".to_string()));
        assert_eq!(cat.label(4), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_convert_to_categorical_in_place() {
        let mut data = csv_from_string("cyl,mpg\n6,21\n4,22.8\n8,18.7").unwrap();
        assert!(data.convert_to_categorical("cyl"));
        assert_eq!(data.is_numeric("cyl"), Some(false));
        assert!(!data.convert_to_categorical("gear"));
    }

    #[test]
    fn test_group_by_and_ungroup() {
        let mut data = csv_from_string("cyl,mpg\n6,21").unwrap().group_by(["cyl"]);
        assert!(data.is_grouped());
        assert_eq!(data.grouping(), &["cyl"]);
        data.ungroup();
        assert!(!data.is_grouped());
    }
}
