//! Sessionize CLI library.
//!
//! Argument parsing, configuration and the `run`/`check` subcommands built on
//! `sz-core`.

mod cli;
pub mod commands;
mod config;
mod files;

pub use cli::{CheckArgs, Cli, Commands, RunArgs, ThresholdArgs};
pub use config::{Config, OutputFormat};
