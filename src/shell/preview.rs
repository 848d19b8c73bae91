use super::Session;
use crate::render::{render_png, RenderConfig};
use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Receives the session after every processed event.
pub trait PreviewSink {
    fn show(&mut self, session: &Session) -> Result<()>;
}

/// Writes each valid preview to a PNG file and reports notices through the log.
///
/// Render and write failures are logged, not returned, so a chart the
/// renderer cannot draw does not end the session.
pub struct PngPreview {
    path: PathBuf,
    config: RenderConfig,
}

impl PngPreview {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        PngPreview {
            path: path.into(),
            config: RenderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }
}

impl PreviewSink for PngPreview {
    fn show(&mut self, session: &Session) -> Result<()> {
        if let Some(notice) = session.notice() {
            warn!("{}", notice);
        }

        let Some(preview) = session.preview() else {
            return Ok(());
        };

        match render_png(&preview.chart, &self.config) {
            Ok(png) => match fs::write(&self.path, png) {
                Ok(()) => {
                    info!(path = %self.path.display(), title = %preview.chart.labels.title, "preview updated")
                }
                Err(err) => {
                    warn!(path = %self.path.display(), "Failed to write preview: {}", err)
                }
            },
            Err(err) => {
                warn!("Failed to render preview: {:#}", err)
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::shell::{Event, Field};
    use std::io::Cursor;

    fn session() -> Session {
        Session::new(Dataset::from_reader(Cursor::new("g,x,y\na,1,2\nb,2,3\na,3,5")).unwrap())
    }

    #[test]
    fn test_png_preview_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let mut sink = PngPreview::new(&path).with_config(RenderConfig { width: 200, height: 150 });

        sink.show(&session()).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn test_png_preview_survives_unrenderable_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.png");
        let mut sink = PngPreview::new(&path);

        let mut session = session();
        // Categorical y builds but cannot be drawn
        session.handle(Event::Set(Field::Y, "g".to_string()));
        assert!(sink.show(&session).is_ok());
        assert!(!path.exists());
    }
}
