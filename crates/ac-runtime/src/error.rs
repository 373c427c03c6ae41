use ac_rules::{RuleEditError, ValidationError};

use crate::platform::PlatformError;

/// Error type for runtime operations.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Malformed setting {key:?}: {source}")]
    Settings {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    RuleEdit(#[from] RuleEditError),
}

impl RuntimeError {
    /// True when the error only means a tab or container disappeared.
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Platform(e) if e.is_not_found())
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ac_rules::validate_rules;

    #[test]
    fn test_is_gone_only_for_missing_resources() {
        let gone: RuntimeError = PlatformError::NotFound("tab 4".into()).into();
        assert!(gone.is_gone());
        assert_eq!(gone.to_string(), "tab 4 not found");

        let rejected: RuntimeError = PlatformError::Rejected("quota".into()).into();
        assert!(!rejected.is_gone());

        let invalid: RuntimeError = validate_rules("a.com,A").unwrap_err().into();
        assert!(!invalid.is_gone());
        assert!(invalid.to_string().starts_with("Invalid comma format on line 1"));
    }
}
