//! The session tracker.
//!
//! Applies the inactivity rule to a time-ordered stream of records:
//!
//! 1. No open session for the client: open one.
//! 2. Gap to the session's last request `<=` threshold: extend it.
//! 3. Gap `>` threshold: close it (emitting a summary) and open a new one.
//!
//! A gap exactly equal to the threshold keeps the session open.
//!
//! The tracker holds no per-call state, so feeding a stream in any number of
//! batches gives the same result as feeding it all at once.

use std::collections::HashMap;

use crate::record::Record;
use crate::session::{Session, SessionSummary};
use crate::types::{ClientId, InactivityThreshold};

/// Tracks at most one open session per client.
#[derive(Debug, Clone)]
pub struct SessionTracker {
    threshold: InactivityThreshold,
    open: HashMap<ClientId, Session>,
    next_seq: u64,
    order_violations: u64,
}

impl SessionTracker {
    pub fn new(threshold: InactivityThreshold) -> Self {
        Self {
            threshold,
            open: HashMap::new(),
            next_seq: 0,
            order_violations: 0,
        }
    }

    pub const fn threshold(&self) -> InactivityThreshold {
        self.threshold
    }

    /// Number of sessions currently open.
    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// Records whose timestamp preceded their client's last request.
    ///
    /// This is a lifetime total; [`flush`](Self::flush) does not reset it.
    pub const fn order_violations(&self) -> u64 {
        self.order_violations
    }

    /// Applies one record, returning the summary of a session it closed.
    ///
    /// Records must arrive in non-decreasing timestamp order. A record that
    /// goes backwards in time has a negative gap and therefore extends the
    /// open session; it is counted in [`order_violations`](Self::order_violations).
    pub fn ingest(&mut self, record: Record) -> Option<SessionSummary> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.ingest_at(record, seq)
    }

    /// Like [`ingest`](Self::ingest) but with a caller-assigned sequence
    /// number, so partitioned runs can keep a global first-seen order.
    pub(crate) fn ingest_at(&mut self, record: Record, seq: u64) -> Option<SessionSummary> {
        let Record {
            client_id,
            timestamp,
            ..
        } = record;

        let Some(session) = self.open.get_mut(&client_id) else {
            self.open
                .insert(client_id.clone(), Session::open(client_id, timestamp, seq));
            return None;
        };

        let gap = timestamp - session.last_time;
        if gap <= self.threshold.as_duration() {
            if gap < chrono::Duration::zero() {
                self.order_violations += 1;
                tracing::debug!(
                    client = %client_id,
                    timestamp = %timestamp,
                    last_seen = %session.last_time,
                    "record out of timestamp order"
                );
            }
            session.extend(timestamp);
            return None;
        }

        let reopened = Session::open(client_id.clone(), timestamp, seq);
        self.open.insert(client_id, reopened).map(Session::close)
    }

    /// Closes every open session.
    ///
    /// Summaries come back in the order their sessions were opened. The
    /// tracker is empty afterwards and can be reused. The order-violation
    /// count and the first-seen sequence carry over, so sessions opened
    /// after a flush still sort after those opened before it.
    pub fn flush(&mut self) -> Vec<SessionSummary> {
        let mut sessions: Vec<Session> = self.open.drain().map(|(_, session)| session).collect();
        sessions.sort_by_key(|session| session.opened_seq);
        sessions.into_iter().map(Session::close).collect()
    }
}
