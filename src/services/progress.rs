use crate::error::{Result, ScrapeError};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// Step spinner on stderr; hidden when logs are verbose.
pub fn spinner(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed}] {msg}")
            .map_err(|e| ScrapeError::Other(e.to_string()))?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

/// Log writer that clears the spinner line while a record is printed.
#[derive(Clone)]
pub struct ProgressWriter {
    progress: ProgressBar,
}

impl ProgressWriter {
    pub fn new(progress: ProgressBar) -> Self {
        Self { progress }
    }
}

impl Write for ProgressWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.progress.suspend(|| io::stderr().write_all(buf))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for ProgressWriter {
    type Writer = ProgressWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
