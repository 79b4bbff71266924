//! Destinations for closed sessions.

use std::io::Write;

use serde::Serialize;
use thiserror::Error;

use crate::record::TIMESTAMP_FORMAT;
use crate::session::SessionSummary;

/// Errors raised while persisting summaries.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Consumes session summaries as they are closed.
pub trait SessionSink {
    /// Persists one summary.
    fn emit(&mut self, summary: &SessionSummary) -> Result<(), SinkError>;

    /// Called once after the last summary.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl SessionSink for Vec<SessionSummary> {
    fn emit(&mut self, summary: &SessionSummary) -> Result<(), SinkError> {
        self.push(summary.clone());
        Ok(())
    }
}

impl<S: SessionSink + ?Sized> SessionSink for Box<S> {
    fn emit(&mut self, summary: &SessionSummary) -> Result<(), SinkError> {
        (**self).emit(summary)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}

/// Counts summaries without keeping them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountingSink {
    /// Summaries emitted.
    pub sessions: u64,
    /// Sum of their request counts.
    pub requests: u64,
}

impl SessionSink for CountingSink {
    fn emit(&mut self, summary: &SessionSummary) -> Result<(), SinkError> {
        self.sessions += 1;
        self.requests += summary.request_count;
        Ok(())
    }
}

/// Writes `client,start,end,duration,count` lines with no header.
#[derive(Debug)]
pub struct CsvSink<W: Write> {
    writer: W,
}

impl<W: Write> CsvSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SessionSink for CsvSink<W> {
    fn emit(&mut self, summary: &SessionSummary) -> Result<(), SinkError> {
        writeln!(self.writer, "{}", summary.to_csv_line())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// One JSON output row.
#[derive(Debug, Serialize)]
struct JsonRow<'a> {
    client_id: &'a str,
    start_time: String,
    end_time: String,
    duration_secs: i64,
    request_count: u64,
}

impl<'a> From<&'a SessionSummary> for JsonRow<'a> {
    fn from(summary: &'a SessionSummary) -> Self {
        Self {
            client_id: summary.client_id.as_str(),
            start_time: summary.start_time.format(TIMESTAMP_FORMAT).to_string(),
            end_time: summary.end_time.format(TIMESTAMP_FORMAT).to_string(),
            duration_secs: summary.duration_secs(),
            request_count: summary.request_count,
        }
    }
}

/// Writes one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SessionSink for JsonLinesSink<W> {
    fn emit(&mut self, summary: &SessionSummary) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &JsonRow::from(summary))?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
