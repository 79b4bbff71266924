//! Core session segmentation logic.
//!
//! This crate contains:
//! - Decoding: turning delimited log lines into [`Record`]s
//! - Tracking: grouping each client's records into sessions separated by an
//!   inactivity threshold ([`SessionTracker`])
//! - Sinks: writing closed sessions as CSV or JSON Lines
//! - Sources and pipelines: batching lines from readers and driving them
//!   through a tracker, sequentially or partitioned by client

mod decoder;
mod partition;
mod pipeline;
mod record;
mod session;
mod sink;
mod source;
mod tracker;
mod types;

pub use decoder::{ColumnMap, DecodeError, FieldNames, RecordDecoder};
pub use partition::sessionize_partitioned;
pub use pipeline::{RunStats, Sessionizer};
pub use record::{DATE_FORMAT, Record, TIME_FORMAT, TIMESTAMP_FORMAT};
pub use session::SessionSummary;
pub use sink::{CountingSink, CsvSink, JsonLinesSink, SessionSink, SinkError};
pub use source::{DEFAULT_BATCH_SIZE, RecordBatches, SourceError, SourceStats};
pub use tracker::SessionTracker;
pub use types::{ClientId, ConfigError, InactivityThreshold};
