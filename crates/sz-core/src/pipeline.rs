//! Drives decoded records through a tracker into a sink.

use serde::Serialize;

use crate::record::Record;
use crate::sink::{SessionSink, SinkError};
use crate::tracker::SessionTracker;
use crate::types::InactivityThreshold;

/// Counters for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Records ingested.
    pub records: u64,
    /// Sessions emitted to the sink.
    pub sessions: u64,
    /// Records that arrived before their client's last request.
    pub order_violations: u64,
}

/// Owns a tracker and the sink its summaries go to.
///
/// Closed sessions are emitted as soon as they close; whatever is still open
/// is emitted in first-seen order by [`finish`](Self::finish).
#[derive(Debug)]
pub struct Sessionizer<S> {
    tracker: SessionTracker,
    sink: S,
    stats: RunStats,
}

impl<S: SessionSink> Sessionizer<S> {
    pub fn new(threshold: InactivityThreshold, sink: S) -> Self {
        Self {
            tracker: SessionTracker::new(threshold),
            sink,
            stats: RunStats::default(),
        }
    }

    pub const fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Ingests a batch of records in order.
    pub fn push_batch(&mut self, records: Vec<Record>) -> Result<(), SinkError> {
        for record in records {
            self.push(record)?;
        }
        Ok(())
    }

    /// Ingests a single record.
    pub fn push(&mut self, record: Record) -> Result<(), SinkError> {
        self.stats.records += 1;
        if let Some(summary) = self.tracker.ingest(record) {
            self.sink.emit(&summary)?;
            self.stats.sessions += 1;
        }
        Ok(())
    }

    /// Flushes open sessions, finishes the sink and hands it back.
    pub fn finish(mut self) -> Result<(S, RunStats), SinkError> {
        for summary in self.tracker.flush() {
            self.sink.emit(&summary)?;
            self.stats.sessions += 1;
        }
        self.sink.finish()?;
        self.stats.order_violations = self.tracker.order_violations();
        Ok((self.sink, self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::decoder::FieldNames;
    use crate::session::SessionSummary;
    use crate::sink::CsvSink;
    use crate::source::{DEFAULT_BATCH_SIZE, RecordBatches};

    const THRESHOLD: i64 = 2;

    const LOG: &str = "\
ip,date,time,zone,cik,accession,extention,code,size,idx,norefer,noagent,find,crawler,browser
101.81.133.jja,2017-06-30,00:00:00,0.0,1608552.0,0001047469-17-004337,-index.htm,200.0,80251.0,1.0,0.0,0.0,9.0,0.0,
107.23.85.jfd,2017-06-30,00:00:00,0.0,1027281.0,0000898430-02-001167,-index.htm,200.0,2825.0,1.0,0.0,0.0,10.0,0.0,
107.23.85.jfd,2017-06-30,00:00:00,0.0,1136894.0,0000905148-07-003827,-index.htm,200.0,3021.0,1.0,0.0,0.0,10.0,0.0,
106.120.173.jie,2017-06-30,00:00:00,0.0,1439124.0,0001193125-17-053716,-index.htm,200.0,6023.0,1.0,0.0,0.0,10.0,0.0,
107.23.85.jfd,2017-06-30,00:00:01,0.0,1027281.0,0000898430-02-001167,-index.htm,200.0,2825.0,1.0,0.0,0.0,10.0,0.0,
107.23.85.jfd,2017-06-30,00:00:01,0.0,1136894.0,0000905148-07-003827,-index.htm,200.0,3021.0,1.0,0.0,0.0,10.0,0.0,
108.91.91.hbc,2017-06-30,00:00:01,0.0,1165002.0,0001047469-17-004337,-index.htm,200.0,56260.0,1.0,0.0,0.0,10.0,0.0,
106.120.173.jie,2017-06-30,00:00:02,0.0,1439124.0,0001193125-17-053716,-index.htm,200.0,6023.0,1.0,0.0,0.0,10.0,0.0,
107.23.85.jfd,2017-06-30,00:00:02,0.0,1136894.0,0000905148-07-003827,-index.htm,200.0,3021.0,1.0,0.0,0.0,10.0,0.0,
107.23.85.jfd,2017-06-30,00:00:02,0.0,1027281.0,0000898430-02-001167,-index.htm,200.0,2825.0,1.0,0.0,0.0,10.0,0.0,
107.23.85.jfd,2017-06-30,00:00:03,0.0,1027281.0,0000898430-02-001167,-index.htm,200.0,2825.0,1.0,0.0,0.0,10.0,0.0,
108.91.91.hbc,2017-06-30,00:00:04,0.0,1165002.0,0001047469-17-004337,-index.htm,200.0,56260.0,1.0,0.0,0.0,10.0,0.0,
101.81.133.jja,2017-06-30,00:00:04,0.0,1608552.0,0001047469-17-004337,-index.htm,200.0,80251.0,1.0,0.0,0.0,9.0,0.0,
";

    fn sessionize(input: &str, batch_size: usize) -> (String, RunStats) {
        let threshold = InactivityThreshold::from_secs(THRESHOLD).unwrap();
        let mut sessionizer = Sessionizer::new(threshold, CsvSink::new(Vec::new()));

        let batches = RecordBatches::open(
            "log.csv",
            Cursor::new(input),
            &FieldNames::default(),
            ',',
            batch_size,
        )
        .unwrap()
        .unwrap();
        for batch in batches {
            sessionizer.push_batch(batch.unwrap()).unwrap();
        }

        let (sink, stats) = sessionizer.finish().unwrap();
        (String::from_utf8(sink.into_inner()).unwrap(), stats)
    }

    #[test]
    fn sessionizes_edgar_sample() {
        let (output, stats) = sessionize(LOG, 5);

        insta::assert_snapshot!(output, @r"
        108.91.91.hbc,2017-06-30 00:00:01,2017-06-30 00:00:01,0,1
        101.81.133.jja,2017-06-30 00:00:00,2017-06-30 00:00:00,0,1
        107.23.85.jfd,2017-06-30 00:00:00,2017-06-30 00:00:03,3,7
        106.120.173.jie,2017-06-30 00:00:00,2017-06-30 00:00:02,2,2
        108.91.91.hbc,2017-06-30 00:00:04,2017-06-30 00:00:04,0,1
        101.81.133.jja,2017-06-30 00:00:04,2017-06-30 00:00:04,0,1
        ");
        assert_eq!(
            stats,
            RunStats {
                records: 13,
                sessions: 6,
                order_violations: 0,
            }
        );
    }

    #[test]
    fn batch_size_does_not_change_output() {
        let (expected, _) = sessionize(LOG, DEFAULT_BATCH_SIZE);
        for batch_size in [1, 2, 3, 7, 13] {
            let (output, _) = sessionize(LOG, batch_size);
            assert_eq!(output, expected, "batch size {batch_size}");
        }
    }

    #[test]
    fn malformed_line_does_not_disturb_neighbors() {
        let clean = "ip,date,time\na,2017-06-30,00:00:00\na,2017-06-30,00:00:02\n";
        let dirty = "ip,date,time\na,2017-06-30,00:00:00\nb,2017-06-30,xx:00:01\na,2017-06-30,00:00:02\n";

        let (clean_out, _) = sessionize(clean, 10);
        let (dirty_out, stats) = sessionize(dirty, 10);

        assert_eq!(clean_out, dirty_out);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.sessions, 1);
    }

    #[test]
    fn sessions_span_sources() {
        let threshold = InactivityThreshold::from_secs(30).unwrap();
        let mut sessionizer = Sessionizer::new(threshold, Vec::<SessionSummary>::new());

        for (name, input) in [
            ("day-1.csv", "ip,date,time\nA,2017-06-30,23:59:50\n"),
            ("day-2.csv", "ip,date,time\nA,2017-07-01,00:00:10\n"),
        ] {
            let batches =
                RecordBatches::open(name, Cursor::new(input), &FieldNames::default(), ',', 10)
                    .unwrap()
                    .unwrap();
            for batch in batches {
                sessionizer.push_batch(batch.unwrap()).unwrap();
            }
        }
        assert_eq!(sessionizer.tracker().open_count(), 1);

        let (summaries, stats) = sessionizer.finish().unwrap();
        assert_eq!(stats.sessions, 1);
        assert_eq!(
            summaries[0].to_csv_line(),
            "A,2017-06-30 23:59:50,2017-07-01 00:00:10,20,2"
        );
    }

    #[test]
    fn finish_reports_order_violations() {
        let input = "ip,date,time\nA,2017-06-30,00:00:10\nA,2017-06-30,00:00:05\n";
        let (output, stats) = sessionize(input, 10);

        assert_eq!(stats.order_violations, 1);
        assert_eq!(
            output.trim_end(),
            "A,2017-06-30 00:00:05,2017-06-30 00:00:10,5,2"
        );
    }
}
