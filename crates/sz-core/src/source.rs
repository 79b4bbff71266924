//! Line-buffered record sources.
//!
//! [`RecordBatches`] wraps any `BufRead`, consumes its header line and yields
//! decoded records in fixed-size batches. Malformed lines, including lines
//! that are not valid UTF-8, are logged and skipped; they never end the
//! stream. Only I/O errors from the underlying reader are fatal.

use std::io::{self, BufRead};

use serde::Serialize;
use thiserror::Error;

use crate::decoder::{DecodeError, FieldNames, RecordDecoder};
use crate::record::Record;
use crate::types::ConfigError;

/// Default number of records per batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Errors that end a run while reading a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Counters for a single source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    /// Data lines read, excluding the header and blank lines.
    pub lines: u64,
    /// Lines that decoded into records.
    pub records: u64,
    /// Lines skipped because they failed to decode.
    pub malformed: u64,
}

impl std::ops::AddAssign for SourceStats {
    fn add_assign(&mut self, other: Self) {
        self.lines += other.lines;
        self.records += other.records;
        self.malformed += other.malformed;
    }
}

/// Decoded records from one source, in batches.
pub struct RecordBatches<R> {
    name: String,
    reader: R,
    buf: Vec<u8>,
    decoder: RecordDecoder,
    batch_size: usize,
    line_no: u64,
    stats: SourceStats,
}

impl<R: BufRead> RecordBatches<R> {
    /// Reads the header of `reader` and prepares to decode the rest.
    ///
    /// Returns `Ok(None)` for a source with no header line at all.
    pub fn open(
        name: impl Into<String>,
        mut reader: R,
        fields: &FieldNames,
        delimiter: char,
        batch_size: usize,
    ) -> Result<Option<Self>, SourceError> {
        if batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize.into());
        }
        let name = name.into();
        let mut buf = Vec::new();

        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                tracing::warn!(source = %name, "source is empty, skipping");
                return Ok(None);
            }
            Ok(_) => {}
            Err(source) => return Err(SourceError::Io { name, source }),
        }
        let header = String::from_utf8_lossy(trim_line_ending(&buf));
        let decoder = RecordDecoder::from_header(&header, delimiter, fields)?;
        tracing::debug!(
            source = %name,
            columns = decoder.columns().width(),
            "read header"
        );

        buf.clear();
        Ok(Some(Self {
            name,
            reader,
            buf,
            decoder,
            batch_size,
            line_no: 1,
            stats: SourceStats::default(),
        }))
    }

    /// Name used in log messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Counters for what has been read so far.
    pub const fn stats(&self) -> SourceStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for RecordBatches<R> {
    type Item = Result<Vec<Record>, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut batch = Vec::with_capacity(self.batch_size);

        while batch.len() < self.batch_size {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(source) => {
                    return Some(Err(SourceError::Io {
                        name: self.name.clone(),
                        source,
                    }));
                }
            }
            self.line_no += 1;

            let line = trim_line_ending(&self.buf);
            if line.trim_ascii().is_empty() {
                continue;
            }
            self.stats.lines += 1;

            let decoded = std::str::from_utf8(line)
                .map_err(|source| DecodeError::InvalidEncoding { source })
                .and_then(|line| self.decoder.decode(line));
            match decoded {
                Ok(record) => {
                    self.stats.records += 1;
                    batch.push(record);
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    tracing::warn!(
                        source = %self.name,
                        line = self.line_no,
                        error = %e,
                        "skipping malformed record"
                    );
                }
            }
        }

        if batch.is_empty() { None } else { Some(Ok(batch)) }
    }
}

/// Strips a trailing `\n` or `\r\n`.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
