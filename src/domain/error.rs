use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("zone path `{path}` contains no zone names")]
    EmptyZonePath { path: String },
    #[error("order key `{key}` has non-numeric segment `{segment}`")]
    InvalidOrderKey { key: String, segment: String },
    #[error("self-placement `{value}` is malformed: {reason}")]
    InvalidSelfPlacement { value: String, reason: String },
}

impl DomainError {
    pub fn empty_zone_path(path: impl Into<String>) -> Self {
        Self::EmptyZonePath { path: path.into() }
    }

    pub fn invalid_order_key(key: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::InvalidOrderKey {
            key: key.into(),
            segment: segment.into(),
        }
    }

    pub fn invalid_self_placement(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelfPlacement {
            value: value.into(),
            reason: reason.into(),
        }
    }
}
