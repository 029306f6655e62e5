//! Crate-level error types for acton-chain.
//!
//! Tool failures have their own `ToolError` (see `crate::tools`) and never
//! escape a chain: they are captured in each `ToolOutcome`. `ChainError`
//! covers what happens around chains, namely loading configuration and
//! persisting execution summaries.
//!
//! No external error crates (anyhow, thiserror, eyre) are used.

use std::fmt;

/// Errors raised outside of chain execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainError {
    /// The specific error that occurred
    pub kind: ChainErrorKind,
}

/// Specific crate-level error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainErrorKind {
    /// Configuration could not be read or was invalid
    Configuration {
        /// Which setting or file was affected
        field: String,
        /// Why it was rejected
        reason: String,
    },
    /// An execution summary could not be recorded
    Recorder {
        /// Reason for the failure
        reason: String,
    },
}

impl ChainError {
    /// Creates a new ChainError with the given kind.
    #[must_use]
    pub fn new(kind: ChainErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ChainErrorKind::Configuration {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a recorder error.
    #[must_use]
    pub fn recorder(reason: impl Into<String>) -> Self {
        Self::new(ChainErrorKind::Recorder {
            reason: reason.into(),
        })
    }

    /// Returns true if this error indicates a configuration problem.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ChainErrorKind::Configuration { .. })
    }

    /// Returns true if this error came from an execution recorder.
    #[must_use]
    pub fn is_recorder(&self) -> bool {
        matches!(self.kind, ChainErrorKind::Recorder { .. })
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ChainErrorKind::Configuration { field, reason } => {
                write!(
                    f,
                    "configuration error for '{}': {}; check the config file or defaults",
                    field, reason
                )
            }
            ChainErrorKind::Recorder { reason } => {
                write!(
                    f,
                    "failed to record chain execution: {}; the chain result is unaffected",
                    reason
                )
            }
        }
    }
}

impl std::error::Error for ChainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_display_names_field() {
        let error = ChainError::configuration("limits.max_depth", "must be a number");
        let message = error.to_string();
        assert!(message.contains("'limits.max_depth'"));
        assert!(message.contains("must be a number"));
        assert!(error.is_configuration());
        assert!(!error.is_recorder());
    }

    #[test]
    fn recorder_display() {
        let error = ChainError::recorder("store offline");
        assert!(error.to_string().contains("store offline"));
        assert!(error.is_recorder());
    }

    #[test]
    fn errors_are_comparable_and_boxable() {
        let a = ChainError::recorder("x");
        assert_eq!(a.clone(), a);
        let boxed: Box<dyn std::error::Error> = Box::new(a);
        assert!(boxed.to_string().starts_with("failed to record"));
    }
}
