//! Check command: decode logs and report what a run would see.

use std::collections::HashSet;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use sz_core::{
    ClientId, CountingSink, InactivityThreshold, RecordBatches, Sessionizer, SourceStats,
};

use crate::Config;
use crate::cli::CheckArgs;
use crate::commands::util::open_sources;

/// Statistics for a set of logs.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub inactivity_secs: u32,
    pub sources: Vec<SourceReport>,
    pub totals: SourceStats,
    pub clients: usize,
    pub sessions: u64,
    /// Requests covered by those sessions.
    pub requests: u64,
    pub order_violations: u64,
}

#[derive(Debug, Serialize)]
pub struct SourceReport {
    pub name: String,
    #[serde(flatten)]
    pub stats: SourceStats,
}

pub fn run<W: Write>(writer: &mut W, args: &CheckArgs, config: &Config) -> Result<()> {
    let threshold = config.threshold(&args.threshold)?;
    let sources = open_sources(&args.inputs, config, config.batch_size)?;
    let report = build_report(sources, threshold)?;

    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &report)?;
        writeln!(writer)?;
    } else {
        write!(writer, "{}", format_report(&report))?;
    }
    Ok(())
}

/// Reads every source to the end, counting sessions without writing them.
pub fn build_report<R: BufRead>(
    sources: Vec<RecordBatches<R>>,
    threshold: InactivityThreshold,
) -> Result<CheckReport> {
    let mut sessionizer = Sessionizer::new(threshold, CountingSink::default());
    let mut clients: HashSet<ClientId> = HashSet::new();
    let mut reports = Vec::with_capacity(sources.len());
    let mut totals = SourceStats::default();

    for mut source in sources {
        for batch in source.by_ref() {
            let batch = batch?;
            for record in &batch {
                if !clients.contains(&record.client_id) {
                    clients.insert(record.client_id.clone());
                }
            }
            sessionizer.push_batch(batch)?;
        }
        totals += source.stats();
        reports.push(SourceReport {
            name: source.name().to_string(),
            stats: source.stats(),
        });
    }

    let (counts, stats) = sessionizer.finish().context("failed to count sessions")?;
    Ok(CheckReport {
        inactivity_secs: threshold.as_secs(),
        sources: reports,
        totals,
        clients: clients.len(),
        sessions: counts.sessions,
        requests: counts.requests,
        order_violations: stats.order_violations,
    })
}

pub fn format_report(report: &CheckReport) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    for source in &report.sources {
        let _ = writeln!(out, "{}: {}", source.name, format_stats(source.stats));
    }
    let _ = writeln!(out, "Total: {}", format_stats(report.totals));
    let _ = writeln!(out, "Clients: {}", report.clients);
    let _ = writeln!(
        out,
        "Sessions: {} covering {} requests (inactivity {}s)",
        report.sessions, report.requests, report.inactivity_secs
    );
    if report.order_violations > 0 {
        let _ = writeln!(
            out,
            "Out-of-order records: {} (input is not sorted by time)",
            report.order_violations
        );
    }
    out
}

fn format_stats(stats: SourceStats) -> String {
    format!(
        "{} lines, {} records, {} malformed",
        stats.lines, stats.records, stats.malformed
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use insta::assert_snapshot;
    use sz_core::FieldNames;

    use crate::commands::util::open_named;

    const LOG: &str = "\
ip,date,time,cik
a,2017-06-30,00:00:00,1
b,2017-06-30,00:00:01,2
a,2017-06-30,00:00:05,3
b,2017-06-30,00:00:02,4
a,2017-06-30,00:00:06,oops,extra
";

    fn report(input: &'static str, threshold_secs: i64) -> CheckReport {
        let source = open_named(
            "access.csv".to_string(),
            Cursor::new(input),
            &FieldNames::default(),
            &Config::default(),
            2,
        )
        .unwrap()
        .unwrap();
        let threshold = InactivityThreshold::from_secs(threshold_secs).unwrap();
        build_report(vec![source], threshold).unwrap()
    }

    #[test]
    fn report_counts_sources_clients_and_sessions() {
        let report = report(LOG, 2);

        assert_eq!(report.clients, 2);
        assert_eq!(report.sessions, 3);
        assert_eq!(report.requests, 4);
        assert_eq!(report.order_violations, 0);
        assert_snapshot!(format_report(&report), @r"
        access.csv: 5 lines, 4 records, 1 malformed
        Total: 5 lines, 4 records, 1 malformed
        Clients: 2
        Sessions: 3 covering 4 requests (inactivity 2s)
        ");
    }

    #[test]
    fn report_flags_unsorted_input() {
        let unsorted = "\
ip,date,time
a,2017-06-30,00:00:10
a,2017-06-30,00:00:04
";
        let report = report(unsorted, 2);

        assert_eq!(report.sessions, 1);
        assert_eq!(report.order_violations, 1);
        assert!(format_report(&report).contains("Out-of-order records: 1"));
    }

    #[test]
    fn json_report_flattens_source_stats() {
        let report = report(LOG, 2);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["sources"][0]["name"], "access.csv");
        assert_eq!(json["sources"][0]["malformed"], 1);
        assert_eq!(json["totals"]["records"], 4);
        assert_eq!(json["inactivity_secs"], 2);
    }
}
