//! Interactive builder: a single-threaded loop over one mutable request.
//!
//! Every [`Event::Set`] rewrites one field of the current [`PlotArgs`] and
//! rebuilds the chart synchronously. A failed rebuild leaves the previous
//! preview in place and records a notice; it never ends the session.
//! [`Event::Confirm`] hands back the last valid chart together with the
//! Rust source that reproduces it.

pub mod preview;
pub mod prompt;
pub mod script;
pub mod source;

use crate::builder::{build_plot, PlotArgs};
use crate::dataset::Dataset;
use crate::ir::ChartSpec;
use anyhow::Result;
use std::fmt;
use tracing::{debug, info};

pub use preview::{PngPreview, PreviewSink};
pub use prompt::PromptEvents;
pub use script::ScriptEvents;
pub use source::source_text;

/// Group value meaning "no group column".
pub const NO_GROUP: &str = "None";
/// Palette value meaning "use the generated default".
pub const DEFAULT_PALETTE: &str = "default";

/// Form fields the user can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    X,
    Y,
    Group,
    PlotType,
    Palette,
    Theme,
    Title,
    Subtitle,
    Caption,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::X,
        Field::Y,
        Field::Group,
        Field::PlotType,
        Field::Palette,
        Field::Theme,
        Field::Title,
        Field::Subtitle,
        Field::Caption,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::X => "x",
            Field::Y => "y",
            Field::Group => "group",
            Field::PlotType => "type",
            Field::Palette => "palette",
            Field::Theme => "theme",
            Field::Title => "title",
            Field::Subtitle => "subtitle",
            Field::Caption => "caption",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Set(Field, String),
    Confirm,
    Cancel,
}

/// The last request that built successfully, with its chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub args: PlotArgs,
    pub chart: ChartSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShellOutcome {
    pub chart: ChartSpec,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Continue,
    Confirmed(ShellOutcome),
    Cancelled,
}

/// Supplies user input, one event at a time. `Ok(None)` means input is
/// exhausted and the session is treated as cancelled.
pub trait EventSource {
    fn next_event(&mut self, session: &Session) -> Result<Option<Event>>;
}

pub struct Session {
    dataset: Dataset,
    request: PlotArgs,
    preview: Option<Preview>,
    notice: Option<String>,
}

impl Session {
    pub fn new(dataset: Dataset) -> Self {
        let request = initial_request(&dataset);
        let mut session = Session {
            dataset,
            request,
            preview: None,
            notice: None,
        };
        session.rebuild();
        session
    }

    pub fn columns(&self) -> &[String] {
        self.dataset.column_names()
    }

    pub fn request(&self) -> &PlotArgs {
        &self.request
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Message from the most recent failed rebuild or confirm, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Current value of a field as shown in the form, sentinels included.
    pub fn display_value(&self, field: Field) -> String {
        let r = &self.request;
        match field {
            Field::X => r.x.clone(),
            Field::Y => r.y.clone(),
            Field::Group => r.group.clone().unwrap_or_else(|| NO_GROUP.to_string()),
            Field::PlotType => r.plot_type.clone(),
            Field::Palette => r.palette.clone().unwrap_or_else(|| DEFAULT_PALETTE.to_string()),
            Field::Theme => r.theme.clone(),
            Field::Title => r.title.clone().unwrap_or_default(),
            Field::Subtitle => r.subtitle.clone().unwrap_or_default(),
            Field::Caption => r.caption.clone().unwrap_or_default(),
        }
    }

    pub fn handle(&mut self, event: Event) -> Step {
        match event {
            Event::Set(field, value) => {
                self.set(field, value);
                self.rebuild();
                Step::Continue
            }
            Event::Confirm => match &self.preview {
                Some(preview) => {
                    info!("chart confirmed");
                    Step::Confirmed(ShellOutcome {
                        chart: preview.chart.clone(),
                        source: source_text(&preview.args),
                    })
                }
                None => {
                    self.notice = Some("Nothing to confirm yet: no valid chart has been built".to_string());
                    Step::Continue
                }
            },
            Event::Cancel => {
                info!("builder cancelled");
                Step::Cancelled
            }
        }
    }

    fn set(&mut self, field: Field, value: String) {
        debug!(field = %field, value = %value, "field changed");
        let r = &mut self.request;
        match field {
            Field::X => r.x = value,
            Field::Y => r.y = value,
            Field::Group => r.group = (value != NO_GROUP).then_some(value),
            Field::PlotType => r.plot_type = value,
            Field::Palette => r.palette = (value != DEFAULT_PALETTE).then_some(value),
            Field::Theme => r.theme = value,
            Field::Title => r.title = (!value.is_empty()).then_some(value),
            Field::Subtitle => r.subtitle = (!value.is_empty()).then_some(value),
            Field::Caption => r.caption = (!value.is_empty()).then_some(value),
        }
    }

    fn rebuild(&mut self) {
        match build_plot(&self.dataset, &self.request) {
            Ok(chart) => {
                self.preview = Some(Preview {
                    args: self.request.clone(),
                    chart,
                });
                self.notice = None;
            }
            Err(err) => {
                debug!(error = %err, "rebuild failed, keeping previous preview");
                self.notice = Some(err.to_string());
            }
        }
    }
}

/// x is the first column; y the first numeric column after it, else the
/// second column, else x again.
fn initial_request(dataset: &Dataset) -> PlotArgs {
    let names = dataset.column_names();
    let x = names.first().cloned().unwrap_or_default();
    let y = names
        .iter()
        .skip(1)
        .find(|n| dataset.is_numeric(n) == Some(true))
        .or_else(|| names.get(1))
        .cloned()
        .unwrap_or_else(|| x.clone());
    PlotArgs::new(x, y)
}

/// Drive a session with the given input and preview until the user
/// confirms (`Some`) or cancels (`None`).
pub fn launch_with<E, P>(dataset: Dataset, events: &mut E, preview: &mut P) -> Result<Option<ShellOutcome>>
where
    E: EventSource + ?Sized,
    P: PreviewSink + ?Sized,
{
    let mut session = Session::new(dataset);
    preview.show(&session)?;

    loop {
        let Some(event) = events.next_event(&session)? else {
            info!("input closed, leaving builder");
            return Ok(None);
        };
        match session.handle(event) {
            Step::Continue => preview.show(&session)?,
            Step::Confirmed(outcome) => return Ok(Some(outcome)),
            Step::Cancelled => return Ok(None),
        }
    }
}

/// Terminal form with a PNG preview written to the system temp directory.
pub fn launch(dataset: Dataset) -> Result<Option<ShellOutcome>> {
    let mut events = PromptEvents::new();
    let mut preview = PngPreview::new(std::env::temp_dir().join("plotwrap-preview.png"));
    launch_with(dataset, &mut events, &mut preview)
}
