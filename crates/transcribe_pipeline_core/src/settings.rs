//! Process-wide settings, read once at startup.
//!
//! Both loaders take a lookup function so they can be fed from the process
//! environment (`from_env`) or from a fixed table in tests.

use std::str::FromStr;

use thiserror::Error;

pub const BUCKETS_TO_CLEAN: &str = "BUCKETS_TO_CLEAN";
pub const CLEANUP_SIGNAL_MODE: &str = "CLEANUP_SIGNAL_MODE";
pub const RAW_AUDIO_BUCKET_NAME: &str = "RAW_AUDIO_BUCKET_NAME";
pub const TRANSCRIBED_AUDIO_BUCKET_NAME: &str = "TRANSCRIBED_AUDIO_BUCKET_NAME";
pub const AUDIO_LANGUAGE_CODE: &str = "AUDIO_LANGUAGE_CODE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{0} must be configured")]
    Missing(&'static str),
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("{name} has unsupported value {value:?} (expected one of: per-bucket, aggregate)")]
    InvalidSignalMode { name: &'static str, value: String },
}

/// How the cleaner answers the lifecycle callback for a delete request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignalMode {
    /// One callback per bucket outcome, in configured order.
    #[default]
    PerBucket,
    /// One callback after every bucket has been attempted.
    Aggregate,
}

impl FromStr for SignalMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per-bucket" | "per_bucket" => Ok(Self::PerBucket),
            "aggregate" => Ok(Self::Aggregate),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanerSettings {
    pub buckets: Vec<String>,
    pub signal_mode: SignalMode,
}

impl CleanerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let buckets = lookup(BUCKETS_TO_CLEAN).ok_or(SettingsError::Missing(BUCKETS_TO_CLEAN))?;
        let signal_mode = match lookup(CLEANUP_SIGNAL_MODE) {
            Some(value) if !value.trim().is_empty() => {
                value
                    .parse()
                    .map_err(|value| SettingsError::InvalidSignalMode {
                        name: CLEANUP_SIGNAL_MODE,
                        value,
                    })?
            }
            _ => SignalMode::default(),
        };

        Ok(Self {
            buckets: parse_bucket_list(&buckets),
            signal_mode,
        })
    }
}

/// Splits a comma-separated bucket list, keeping order and dropping blanks.
pub fn parse_bucket_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|bucket| !bucket.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriberSettings {
    pub raw_audio_bucket: String,
    pub transcribed_audio_bucket: String,
    pub language_code: String,
}

impl TranscriberSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        Ok(Self {
            raw_audio_bucket: required(&lookup, RAW_AUDIO_BUCKET_NAME)?,
            transcribed_audio_bucket: required(&lookup, TRANSCRIBED_AUDIO_BUCKET_NAME)?,
            language_code: required(&lookup, AUDIO_LANGUAGE_CODE)?,
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, SettingsError> {
    let value = lookup(name).ok_or(SettingsError::Missing(name))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SettingsError::Blank(name));
    }
    Ok(trimmed.to_string())
}
