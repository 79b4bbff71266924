//! Configuration loading and management.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use sz_core::{ConfigError, DEFAULT_BATCH_SIZE, FieldNames, InactivityThreshold};

use crate::cli::ThresholdArgs;

/// Format of the session output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `client,start,end,duration,count` lines.
    #[default]
    Csv,
    /// One JSON object per line.
    Jsonl,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Inactivity threshold in seconds, used when none is given on the
    /// command line.
    pub inactivity_secs: i64,

    /// Column delimiter of input logs.
    pub delimiter: char,

    /// Header name of the client identifier column.
    pub client_field: String,

    /// Header name of the date column.
    pub date_field: String,

    /// Header name of the time column.
    pub time_field: String,

    /// Records decoded per batch.
    pub batch_size: usize,

    /// Output format.
    pub format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        let fields = FieldNames::default();
        Self {
            inactivity_secs: 2,
            delimiter: ',',
            client_field: fields.client,
            date_field: fields.date,
            time_field: fields.time,
            batch_size: DEFAULT_BATCH_SIZE,
            format: OutputFormat::Csv,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (SESSIONIZE_*)
        figment = figment.merge(Env::prefixed("SESSIONIZE_"));

        figment.extract()
    }

    /// Names of the required input columns.
    pub fn field_names(&self) -> FieldNames {
        FieldNames {
            client: self.client_field.clone(),
            date: self.date_field.clone(),
            time: self.time_field.clone(),
        }
    }

    /// Resolves the inactivity threshold.
    ///
    /// An explicit `--inactivity` wins over `--inactivity-file`, which wins
    /// over `inactivity_secs` from the configuration.
    pub fn threshold(&self, args: &ThresholdArgs) -> Result<InactivityThreshold> {
        if let Some(secs) = args.inactivity {
            return Ok(InactivityThreshold::from_secs(secs)?);
        }
        if let Some(path) = &args.inactivity_file {
            return read_threshold_file(path);
        }
        InactivityThreshold::from_secs(self.inactivity_secs)
            .context("invalid inactivity_secs in configuration")
    }
}

/// Reads a threshold from the first line of a file.
pub fn read_threshold_file(path: &Path) -> Result<InactivityThreshold> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_threshold_file(&content)
        .with_context(|| format!("invalid inactivity threshold in {}", path.display()))
}

fn parse_threshold_file(content: &str) -> Result<InactivityThreshold, ConfigError> {
    let mut lines = content.lines();
    let first = lines.next().unwrap_or_default();
    if lines.any(|line| !line.trim().is_empty()) {
        tracing::warn!("only the first line of the inactivity file is used");
    }
    first.parse()
}

/// Returns the platform-specific config directory for sessionize.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sessionize"))
}
