use super::{Event, EventSource, Field, Session, DEFAULT_PALETTE, NO_GROUP};
use crate::ir::{PlotType, ThemeStyle};
use crate::palette::BuiltinPalette;
use anyhow::{Context, Result};
use dialoguer::{Input, Select};

/// Terminal form: a menu of fields, each edited with a picker bound to the
/// dataset's columns or to the fixed vocabularies.
#[derive(Debug, Default)]
pub struct PromptEvents;

impl PromptEvents {
    pub fn new() -> Self {
        PromptEvents
    }
}

const DONE: &str = "Done";
const CANCEL: &str = "Cancel";

impl EventSource for PromptEvents {
    fn next_event(&mut self, session: &Session) -> Result<Option<Event>> {
        loop {
            let mut items: Vec<String> = Field::ALL
                .iter()
                .map(|f| format!("{:<9} {}", f.name(), session.display_value(*f)))
                .collect();
            items.push(DONE.to_string());
            items.push(CANCEL.to_string());

            let prompt = match session.notice() {
                Some(notice) => format!("Edit plot  [!] {}", notice),
                None => "Edit plot".to_string(),
            };

            let choice = Select::new()
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact_opt()
                .context("Failed to read menu choice")?;

            let field = match choice {
                None => return Ok(Some(Event::Cancel)),
                Some(i) if i < Field::ALL.len() => Field::ALL[i],
                Some(i) if items[i] == DONE => return Ok(Some(Event::Confirm)),
                Some(_) => return Ok(Some(Event::Cancel)),
            };

            // Escaping a picker goes back to the menu
            if let Some(value) = ask(field, session)? {
                return Ok(Some(Event::Set(field, value)));
            }
        }
    }
}

fn ask(field: Field, session: &Session) -> Result<Option<String>> {
    let current = session.display_value(field);
    let options: Vec<String> = match field {
        Field::X | Field::Y => session.columns().to_vec(),
        Field::Group => std::iter::once(NO_GROUP.to_string())
            .chain(session.columns().iter().cloned())
            .collect(),
        Field::PlotType => PlotType::ALL.iter().map(|t| t.as_str().to_string()).collect(),
        Field::Palette => std::iter::once(DEFAULT_PALETTE.to_string())
            .chain(BuiltinPalette::ALL.iter().map(|p| p.name().to_string()))
            .collect(),
        Field::Theme => ThemeStyle::ALL.iter().map(|t| t.as_str().to_string()).collect(),
        Field::Title | Field::Subtitle | Field::Caption => {
            let text: String = Input::new()
                .with_prompt(field.name())
                .with_initial_text(current)
                .allow_empty(true)
                .interact_text()
                .with_context(|| format!("Failed to read {}", field))?;
            return Ok(Some(text));
        }
    };

    let default = options.iter().position(|o| *o == current).unwrap_or(0);
    let picked = Select::new()
        .with_prompt(field.name())
        .items(&options)
        .default(default)
        .interact_opt()
        .with_context(|| format!("Failed to read {}", field))?;

    Ok(picked.map(|i| options[i].clone()))
}
