//! JSON writer for company records

use crate::crawler::{CompanyRecord, CompanyStream};
use crate::{Result, ScrapeError};
use std::io::Write;

/// How consecutive records are separated in the output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonLayout {
    /// Objects written back to back, `{..}{..}`
    #[default]
    Concatenated,

    /// One object per line
    Lines,
}

/// Outcome of draining a record stream into a writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Records written
    pub written: usize,

    /// Company or listing pages that failed (only non-zero when failures are tolerated)
    pub failed: usize,
}

/// Serializes company records as JSON objects onto a byte sink
pub struct JsonRecordWriter<W: Write> {
    sink: W,
    layout: JsonLayout,
}

impl<W: Write> JsonRecordWriter<W> {
    pub fn new(sink: W, layout: JsonLayout) -> Self {
        Self { sink, layout }
    }

    /// Writes one record
    pub fn write_record(&mut self, record: &CompanyRecord) -> Result<()> {
        serde_json::to_writer(&mut self.sink, record)?;
        if self.layout == JsonLayout::Lines {
            self.sink.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Pulls every record from the stream and writes it as it arrives
    ///
    /// A failure item ends the drain with that error, unless the stream was
    /// built to continue past failures, in which case failures are logged and
    /// counted. Cancellation always ends the drain.
    pub async fn write_stream(
        &mut self,
        stream: &mut CompanyStream,
        tolerate_failures: bool,
    ) -> Result<WriteSummary> {
        let mut summary = WriteSummary::default();

        while let Some(item) = stream.next().await {
            match item {
                Ok(record) => {
                    self.write_record(&record)?;
                    summary.written += 1;
                }
                Err(ScrapeError::Cancelled) => return Err(ScrapeError::Cancelled),
                Err(e) if tolerate_failures => {
                    tracing::warn!("Skipping company: {}", e);
                    summary.failed += 1;
                }
                Err(e) => {
                    self.flush()?;
                    return Err(e);
                }
            }
        }

        self.flush()?;
        Ok(summary)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying sink
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.sink)
    }
}
