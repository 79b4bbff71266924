//! Decoded request records.

use chrono::NaiveDateTime;

use crate::types::ClientId;

/// Format of the date column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of the time column.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Format used when writing timestamps back out.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One validated request from the log.
///
/// Only `client_id` and `timestamp` take part in sessionization. The other
/// columns are carried along in `payload`, in header order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub client_id: ClientId,
    pub timestamp: NaiveDateTime,
    pub payload: Vec<String>,
}

impl Record {
    /// Creates a record with no payload columns.
    pub const fn new(client_id: ClientId, timestamp: NaiveDateTime) -> Self {
        Self {
            client_id,
            timestamp,
            payload: Vec::new(),
        }
    }
}
