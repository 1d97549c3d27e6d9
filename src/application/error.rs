use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{pipeline::PipelineError, placement::RuleError, render::RenderError},
    infra::error::InfraError,
};

/// A flattened error chain, outermost message first, for reporting.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }

    /// Messages joined as `outer: inner: innermost`.
    pub fn summary(&self) -> String {
        self.messages.join(": ")
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Rules(#[from] RuleError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::config::LoadError;

    #[test]
    fn report_walks_the_source_chain() {
        let err = AppError::from(InfraError::Read {
            path: PathBuf::from("rules.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        });

        let report = err.report();
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[0].contains("rules.json"));
        assert_eq!(report.messages[1], "no such file");
        assert!(report.summary().ends_with(": no such file"));
    }

    #[test]
    fn configuration_errors_report_the_offending_key() {
        let err = AppError::from(InfraError::from(LoadError::Invalid {
            key: "render.sibling_concurrency",
            reason: "must be at least 1".to_string(),
        }));

        let report = err.report();
        assert_eq!(report.messages[0], "configuration error");
        assert!(report.messages[1].contains("render.sibling_concurrency"));
        assert!(report.summary().ends_with("must be at least 1"));
    }
}
