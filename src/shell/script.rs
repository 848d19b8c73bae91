// Line-oriented event source, for piping a session from a file or stdin.
//
//   x cyl
//   group "am"
//   palette default
//   title Fuel economy by cylinders
//   done
//
// Blank lines and lines starting with '#' are skipped.

use super::{Event, EventSource, Field, Session};
use anyhow::{Context, Result};
use std::io::BufRead;
use tracing::warn;

pub struct ScriptEvents<R> {
    reader: R,
    line_no: usize,
}

impl<R: BufRead> ScriptEvents<R> {
    pub fn new(reader: R) -> Self {
        ScriptEvents { reader, line_no: 0 }
    }
}

impl<R: BufRead> EventSource for ScriptEvents<R> {
    fn next_event(&mut self, _session: &Session) -> Result<Option<Event>> {
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .with_context(|| format!("Failed to read script line {}", self.line_no + 1))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            match parse_command(&line) {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => continue,
                Err(msg) => warn!(line = self.line_no, "{}", msg),
            }
        }
    }
}

/// Parse one script line. `Ok(None)` for blank lines and comments.
pub fn parse_command(line: &str) -> std::result::Result<Option<Event>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word {
        "done" | "confirm" => Ok(Some(Event::Confirm)),
        "cancel" | "quit" => Ok(Some(Event::Cancel)),
        _ => {
            let field = Field::from_name(word).ok_or_else(|| format!("Unknown command '{}'", word))?;
            Ok(Some(Event::Set(field, unquote(rest).to_string())))
        }
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
