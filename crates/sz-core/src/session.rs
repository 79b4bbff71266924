//! Open sessions and the summaries they turn into when closed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::record::TIMESTAMP_FORMAT;
use crate::types::ClientId;

/// A session that is still accepting requests.
///
/// Owned exclusively by a [`SessionTracker`](crate::SessionTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Session {
    pub(crate) client_id: ClientId,
    pub(crate) start_time: NaiveDateTime,
    pub(crate) last_time: NaiveDateTime,
    pub(crate) request_count: u64,
    /// Position of the opening record, used to order flushes.
    pub(crate) opened_seq: u64,
}

impl Session {
    pub(crate) const fn open(client_id: ClientId, timestamp: NaiveDateTime, seq: u64) -> Self {
        Self {
            client_id,
            start_time: timestamp,
            last_time: timestamp,
            request_count: 1,
            opened_seq: seq,
        }
    }

    /// Folds another request into the session.
    ///
    /// Out-of-order timestamps widen the session instead of moving
    /// `last_time` backwards, so `start_time <= last_time` always holds.
    pub(crate) fn extend(&mut self, timestamp: NaiveDateTime) {
        self.last_time = self.last_time.max(timestamp);
        self.start_time = self.start_time.min(timestamp);
        self.request_count += 1;
    }

    pub(crate) fn close(self) -> SessionSummary {
        SessionSummary {
            client_id: self.client_id,
            start_time: self.start_time,
            end_time: self.last_time,
            request_count: self.request_count,
            opened_seq: self.opened_seq,
        }
    }
}

/// A closed session, ready for a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub client_id: ClientId,
    /// Timestamp of the first request.
    #[serde(with = "timestamp_format")]
    pub start_time: NaiveDateTime,
    /// Timestamp of the last request.
    #[serde(with = "timestamp_format")]
    pub end_time: NaiveDateTime,
    pub request_count: u64,
    #[serde(skip)]
    pub(crate) opened_seq: u64,
}

impl SessionSummary {
    /// Seconds between the first and last request.
    pub fn duration_secs(&self) -> i64 {
        (self.end_time - self.start_time).num_seconds()
    }

    /// Renders the summary as one CSV line (without the newline):
    /// `client,start,end,duration,count`.
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.client_id,
            self.start_time.format(TIMESTAMP_FORMAT),
            self.end_time.format(TIMESTAMP_FORMAT),
            self.duration_secs(),
            self.request_count
        )
    }
}

/// Serializes timestamps as `yyyy-mm-dd hh:mm:ss`, matching the CSV output.
mod timestamp_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::record::TIMESTAMP_FORMAT;

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}
