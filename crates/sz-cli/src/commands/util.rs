//! Shared utilities for CLI commands.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};
use sz_core::{FieldNames, RecordBatches};

use crate::Config;
use crate::files::open_input;

/// A record source backed by a file, a gzip stream or stdin.
pub type InputSource = RecordBatches<Box<dyn BufRead>>;

/// Opens every input and validates its header.
///
/// All headers are read before any record is processed, so a missing column
/// in a later file aborts the run without partial output. Empty inputs are
/// skipped.
pub fn open_sources(
    paths: &[PathBuf],
    config: &Config,
    batch_size: usize,
) -> Result<Vec<InputSource>> {
    let fields = config.field_names();
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let reader = open_input(path)?;
        let name = path.display().to_string();
        if let Some(source) = open_named(name, reader, &fields, config, batch_size)? {
            sources.push(source);
        }
    }
    Ok(sources)
}

/// Opens a single reader as a record source.
pub fn open_named<R: BufRead>(
    name: String,
    reader: R,
    fields: &FieldNames,
    config: &Config,
    batch_size: usize,
) -> Result<Option<RecordBatches<R>>> {
    RecordBatches::open(name.clone(), reader, fields, config.delimiter, batch_size)
        .with_context(|| format!("failed to open log {name}"))
}
