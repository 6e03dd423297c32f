use crate::output::stats::PipelineSnapshot;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Appends periodic metrics lines to a file
///
/// A header naming the columns is written when the log is opened.
pub struct MetricsLog {
    writer: BufWriter<File>,
}

impl MetricsLog {
    /// Opens (or creates) the metrics file in append mode
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", PipelineSnapshot::HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Writes one snapshot line and flushes it
    pub fn record(&mut self, snapshot: &PipelineSnapshot) -> std::io::Result<()> {
        writeln!(self.writer, "{}", snapshot)?;
        self.writer.flush()
    }
}
