use std::path::PathBuf;

use thiserror::Error;

use crate::{application::placement::RuleError, config::LoadError};

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid placement rules in `{path}`")]
    RuleFile {
        path: PathBuf,
        #[source]
        source: RuleError,
    },
    #[error("failed to decode `{path}`: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error")]
    Configuration(#[from] LoadError),
}

impl InfraError {
    pub fn decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
