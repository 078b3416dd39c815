//! Environment configuration for the sweeper

use chrono::FixedOffset;
use grabgrub_core::application::constants::DEFAULT_SWEEP_INTERVAL;
use grabgrub_core::domain::ExpiryClock;
use grabgrub_core::error::{AppError, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "~/.grabgrub/storage.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub db_path: PathBuf,
    pub sweep_interval: Duration,
    /// `None` means the system local zone
    pub utc_offset: Option<FixedOffset>,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source (tests pass a map)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("GRABGRUB_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = PathBuf::from(shellexpand::tilde(&db_path).into_owned());

        let sweep_interval = match lookup("GRABGRUB_SWEEP_INTERVAL_SECS") {
            None => DEFAULT_SWEEP_INTERVAL,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(AppError::Config(format!(
                        "GRABGRUB_SWEEP_INTERVAL_SECS must be a positive integer, got '{}'",
                        raw
                    )))
                }
            },
        };

        let utc_offset = lookup("GRABGRUB_UTC_OFFSET")
            .filter(|s| !s.trim().is_empty())
            .map(|raw| {
                raw.trim().parse::<FixedOffset>().map_err(|_| {
                    AppError::Config(format!(
                        "GRABGRUB_UTC_OFFSET must look like +02:00, got '{}'",
                        raw
                    ))
                })
            })
            .transpose()?;

        let log_format = match lookup("GRABGRUB_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(AppError::Config(format!(
                    "GRABGRUB_LOG_FORMAT must be pretty or json, got '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            db_path,
            sweep_interval,
            utc_offset,
            log_format,
        })
    }

    pub fn clock(&self) -> ExpiryClock {
        match self.utc_offset {
            Some(offset) => ExpiryClock::with_offset(offset),
            None => ExpiryClock::local(),
        }
    }
}
