//! Error types raised by the dataset loader and the plot builder.

use thiserror::Error;

/// Result type alias using [`PlotError`].
pub type Result<T> = std::result::Result<T, PlotError>;

/// Errors surfaced by [`crate::builder::build_plot`] and [`crate::dataset::Dataset`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotError {
    /// Input could not be treated as a table of named, equal-length columns.
    #[error("Input is not a dataset: {0}")]
    NotADataset(String),

    /// A column referenced as x, y or group does not exist.
    #[error("Column '{column}' ({role}) not found. Available columns: {}", available.join(", "))]
    ColumnNotFound {
        /// Name as supplied by the caller.
        column: String,
        /// Which argument referenced it ("x", "y" or "group").
        role: &'static str,
        /// Columns the dataset does have.
        available: Vec<String>,
    },

    #[error("Invalid plot type '{0}'. Expected one of: point, line, boxplot, violin")]
    InvalidPlotType(String),

    #[error("Invalid theme '{0}'. Expected one of: minimal, classic")]
    InvalidTheme(String),
}
