//! Core type definitions with validation.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal configuration errors.
///
/// Any of these aborts a run before the first record is processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The inactivity threshold was outside the accepted range.
    #[error(
        "inactivity threshold must be between {min} and {max} seconds, got {value}",
        min = InactivityThreshold::MIN_SECS,
        max = InactivityThreshold::MAX_SECS
    )]
    ThresholdOutOfRange { value: i64 },

    /// The inactivity threshold could not be read as an integer.
    #[error("inactivity threshold must be an integer number of seconds, got {value:?}")]
    InvalidThreshold { value: String },

    /// A required column name was not present in the header line.
    #[error("required column {name:?} not found in header")]
    MissingColumn { name: String },

    /// A client identifier was empty.
    #[error("client ID cannot be empty")]
    EmptyClientId,

    /// Records must be batched in groups of at least one.
    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}

/// A validated client identifier.
///
/// Client IDs must be non-empty strings. Two records with equal IDs belong to
/// the same client (e.g., an IP address in a web server log).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Creates a new ID after validation.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Maximum allowed gap between two requests of the same session.
///
/// Always within \[1, 86400\] seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InactivityThreshold(u32);

impl InactivityThreshold {
    /// Smallest accepted threshold (one second).
    pub const MIN_SECS: u32 = 1;

    /// Largest accepted threshold (one day).
    pub const MAX_SECS: u32 = 86_400;

    /// Creates a threshold after range validation.
    pub fn from_secs(secs: i64) -> Result<Self, ConfigError> {
        u32::try_from(secs)
            .ok()
            .filter(|s| (Self::MIN_SECS..=Self::MAX_SECS).contains(s))
            .map(Self)
            .ok_or(ConfigError::ThresholdOutOfRange { value: secs })
    }

    /// Returns the threshold in whole seconds.
    #[must_use]
    pub const fn as_secs(self) -> u32 {
        self.0
    }

    /// Returns the threshold as a `chrono::Duration`.
    #[must_use]
    pub fn as_duration(self) -> Duration {
        Duration::seconds(i64::from(self.0))
    }
}

impl std::str::FromStr for InactivityThreshold {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let secs: i64 = trimmed.parse().map_err(|_| ConfigError::InvalidThreshold {
            value: trimmed.to_string(),
        })?;
        Self::from_secs(secs)
    }
}

impl fmt::Display for InactivityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
