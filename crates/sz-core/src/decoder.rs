//! Line decoding.
//!
//! A [`ColumnMap`] is derived once from the header line of a source and then
//! reused by a [`RecordDecoder`] for every following line. Failing to find a
//! required column is a fatal [`ConfigError`]; everything that can go wrong
//! with a single line is a [`DecodeError`], which callers log and skip.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{DATE_FORMAT, Record, TIME_FORMAT};
use crate::types::{ClientId, ConfigError};

/// Per-line decode failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The line does not have the same number of columns as the header.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A required column was present but empty.
    #[error("{field} field is empty")]
    EmptyField { field: &'static str },

    /// The date column did not parse as `yyyy-mm-dd`.
    #[error("invalid date {value:?}")]
    InvalidDate {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidEncoding {
        #[source]
        source: std::str::Utf8Error,
    },

    /// The time column did not parse as `hh:mm:ss`.
    #[error("invalid time {value:?}")]
    InvalidTime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Names of the columns sessionization needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    /// Column holding the client identifier.
    pub client: String,
    /// Column holding the request date.
    pub date: String,
    /// Column holding the request time of day.
    pub time: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            client: "ip".to_string(),
            date: "date".to_string(),
            time: "time".to_string(),
        }
    }
}

/// Positions of the required columns within a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    client: usize,
    date: usize,
    time: usize,
    width: usize,
}

impl ColumnMap {
    /// Builds the mapping from a header line.
    ///
    /// Names are compared after trimming whitespace. If a name appears more
    /// than once, the first occurrence wins.
    pub fn from_header(
        header: &str,
        delimiter: char,
        fields: &FieldNames,
    ) -> Result<Self, ConfigError> {
        let names: Vec<&str> = header
            .trim_start_matches('\u{feff}')
            .split(delimiter)
            .map(str::trim)
            .collect();

        let position = |wanted: &str| {
            names
                .iter()
                .position(|name| *name == wanted)
                .ok_or_else(|| ConfigError::MissingColumn {
                    name: wanted.to_string(),
                })
        };

        Ok(Self {
            client: position(&fields.client)?,
            date: position(&fields.date)?,
            time: position(&fields.time)?,
            width: names.len(),
        })
    }

    /// Number of columns every data line must have.
    pub const fn width(&self) -> usize {
        self.width
    }

    const fn is_required(&self, index: usize) -> bool {
        index == self.client || index == self.date || index == self.time
    }
}

/// Turns raw lines into [`Record`]s.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    columns: ColumnMap,
    delimiter: char,
}

impl RecordDecoder {
    pub const fn new(columns: ColumnMap, delimiter: char) -> Self {
        Self { columns, delimiter }
    }

    /// Reads the column mapping from `header` and builds a decoder for it.
    pub fn from_header(
        header: &str,
        delimiter: char,
        fields: &FieldNames,
    ) -> Result<Self, ConfigError> {
        let columns = ColumnMap::from_header(header, delimiter, fields)?;
        Ok(Self::new(columns, delimiter))
    }

    pub const fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Decodes a single line.
    pub fn decode(&self, line: &str) -> Result<Record, DecodeError> {
        let values: Vec<&str> = line.split(self.delimiter).collect();
        if values.len() != self.columns.width {
            return Err(DecodeError::FieldCount {
                expected: self.columns.width,
                found: values.len(),
            });
        }

        let client = required(values[self.columns.client], "client id")?;
        let date = required(values[self.columns.date], "date")?;
        let time = required(values[self.columns.time], "time")?;

        let date =
            NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|source| {
                DecodeError::InvalidDate {
                    value: date.to_string(),
                    source,
                }
            })?;
        let time =
            NaiveTime::parse_from_str(time, TIME_FORMAT).map_err(|source| {
                DecodeError::InvalidTime {
                    value: time.to_string(),
                    source,
                }
            })?;

        // Non-empty was checked above, so this cannot fail.
        let client_id = ClientId::new(client).map_err(|_| DecodeError::EmptyField {
            field: "client id",
        })?;

        let payload = values
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.columns.is_required(*index))
            .map(|(_, value)| (*value).to_string())
            .collect();

        Ok(Record {
            client_id,
            timestamp: date.and_time(time),
            payload,
        })
    }
}

fn required<'a>(value: &'a str, field: &'static str) -> Result<&'a str, DecodeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DecodeError::EmptyField { field });
    }
    Ok(value)
}
