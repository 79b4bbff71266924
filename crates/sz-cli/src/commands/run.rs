//! Run command: sessionize logs and write one summary per session.

use std::io::BufRead;

use anyhow::{Context, Result};
use sz_core::{
    CsvSink, InactivityThreshold, JsonLinesSink, RecordBatches, RunStats, SessionSink,
    Sessionizer, SourceStats, sessionize_partitioned,
};

use crate::Config;
use crate::cli::RunArgs;
use crate::commands::util::open_sources;
use crate::config::OutputFormat;
use crate::files::open_output;

pub fn run(args: &RunArgs, config: &Config) -> Result<()> {
    let threshold = config.threshold(&args.threshold)?;
    let format = args.format.unwrap_or(config.format);
    let batch_size = args.batch_size.unwrap_or(config.batch_size);

    // Headers are validated before the output is touched.
    let sources = open_sources(&args.inputs, config, batch_size)?;
    tracing::debug!(
        %threshold,
        sources = sources.len(),
        ?format,
        parallel = args.parallel,
        "starting run"
    );

    let writer = open_output(args.output.as_deref(), args.append)?;
    let sink: Box<dyn SessionSink> = match format {
        OutputFormat::Csv => Box::new(CsvSink::new(writer)),
        OutputFormat::Jsonl => Box::new(JsonLinesSink::new(writer)),
    };

    let (_, stats, totals) = if args.parallel {
        sessionize_parallel(sources, threshold, sink)?
    } else {
        sessionize_sequential(sources, threshold, sink)?
    };

    tracing::info!(
        lines = totals.lines,
        records = stats.records,
        malformed = totals.malformed,
        sessions = stats.sessions,
        "sessionization complete"
    );
    if stats.order_violations > 0 {
        tracing::warn!(
            count = stats.order_violations,
            "records were out of timestamp order; they extended their open sessions"
        );
    }
    Ok(())
}

/// Streams every source through one tracker, emitting sessions as they close.
pub fn sessionize_sequential<R: BufRead, S: SessionSink>(
    sources: Vec<RecordBatches<R>>,
    threshold: InactivityThreshold,
    sink: S,
) -> Result<(S, RunStats, SourceStats)> {
    let mut sessionizer = Sessionizer::new(threshold, sink);
    let mut totals = SourceStats::default();

    for mut source in sources {
        for batch in source.by_ref() {
            sessionizer
                .push_batch(batch?)
                .context("failed to write sessions")?;
        }
        log_source(&source);
        totals += source.stats();
    }

    let (sink, stats) = sessionizer.finish().context("failed to write sessions")?;
    Ok((sink, stats, totals))
}

/// Loads every source, then sessionizes clients on the rayon pool.
///
/// Sessions are written in start-time order once all input is read.
pub fn sessionize_parallel<R: BufRead, S: SessionSink>(
    sources: Vec<RecordBatches<R>>,
    threshold: InactivityThreshold,
    mut sink: S,
) -> Result<(S, RunStats, SourceStats)> {
    let mut records = Vec::new();
    let mut totals = SourceStats::default();

    for mut source in sources {
        for batch in source.by_ref() {
            records.extend(batch?);
        }
        log_source(&source);
        totals += source.stats();
    }

    let (summaries, stats) = sessionize_partitioned(records, threshold);
    for summary in &summaries {
        sink.emit(summary).context("failed to write sessions")?;
    }
    sink.finish().context("failed to write sessions")?;
    Ok((sink, stats, totals))
}

fn log_source<R: BufRead>(source: &RecordBatches<R>) {
    let stats = source.stats();
    tracing::debug!(
        source = source.name(),
        lines = stats.lines,
        records = stats.records,
        malformed = stats.malformed,
        "finished source"
    );
}
