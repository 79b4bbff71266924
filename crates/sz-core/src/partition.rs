//! Parallel sessionization partitioned by client.
//!
//! Sessions of different clients never interact, so records can be split by
//! client ID and each partition run through its own tracker. Per-client order
//! is preserved; the cross-client order of the output is imposed afterwards
//! by sorting on `(start_time, position of the opening record)`.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::pipeline::RunStats;
use crate::record::Record;
use crate::session::SessionSummary;
use crate::tracker::SessionTracker;
use crate::types::{ClientId, InactivityThreshold};

/// Sessionizes `records` on the rayon pool.
///
/// Produces the same summaries as feeding the records through a single
/// [`SessionTracker`] and flushing it, sorted by start time.
pub fn sessionize_partitioned(
    records: Vec<Record>,
    threshold: InactivityThreshold,
) -> (Vec<SessionSummary>, RunStats) {
    let total = records.len() as u64;

    let mut partitions: HashMap<ClientId, Vec<(u64, Record)>> = HashMap::new();
    for (seq, record) in (0u64..).zip(records) {
        partitions
            .entry(record.client_id.clone())
            .or_default()
            .push((seq, record));
    }
    tracing::debug!(
        records = total,
        partitions = partitions.len(),
        "partitioned records by client"
    );

    let results: Vec<(Vec<SessionSummary>, u64)> = partitions
        .into_par_iter()
        .map(|(_, records)| {
            let mut tracker = SessionTracker::new(threshold);
            let mut summaries: Vec<SessionSummary> = records
                .into_iter()
                .filter_map(|(seq, record)| tracker.ingest_at(record, seq))
                .collect();
            summaries.extend(tracker.flush());
            (summaries, tracker.order_violations())
        })
        .collect();

    let mut order_violations = 0;
    let mut summaries = Vec::new();
    for (partition, violations) in results {
        order_violations += violations;
        summaries.extend(partition);
    }
    summaries.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then(a.opened_seq.cmp(&b.opened_seq))
    });

    let stats = RunStats {
        records: total,
        sessions: summaries.len() as u64,
        order_violations,
    };
    (summaries, stats)
}
