use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating an [`crate::config::ArbiterConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config json: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors raised by the monitoring event log.
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("event log io error: {0}")]
    Io(#[from] io::Error),

    #[error("event log csv error: {0}")]
    Csv(#[from] csv::Error),
}
