//! Tool error types.
//!
//! Errors raised by the registry (lookup, registration, schema validation)
//! and by tool implementations. The chain executor folds every one of these
//! into a failed `ToolOutcome`; none of them escape `execute_chain`.

use crate::types::InvocationId;
use std::fmt;
use std::time::Duration;

/// Errors that can occur in tool operations.
///
/// The kind is boxed to keep `Result<_, ToolError>` small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    /// Invocation the error belongs to, when raised inside a chain
    pub invocation_id: Option<InvocationId>,
    kind: Box<ToolErrorKind>,
}

/// Specific tool error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// Tool not found in registry
    NotFound {
        /// The name that was looked up
        tool_name: String,
    },
    /// A tool with the same name is already registered
    AlreadyRegistered {
        /// The conflicting name
        tool_name: String,
    },
    /// A required parameter is absent
    MissingParameter {
        /// The tool being validated
        tool_name: String,
        /// The missing field
        field: String,
    },
    /// A parameter value does not match its declared schema type
    TypeMismatch {
        /// The tool being validated
        tool_name: String,
        /// The offending field
        field: String,
        /// Declared schema type
        expected: String,
        /// JSON type that was supplied
        actual: String,
    },
    /// Arguments are unusable for another reason (not an object, enum violation, ...)
    ValidationFailed {
        /// The tool being validated
        tool_name: String,
        /// What was invalid
        reason: String,
    },
    /// The tool implementation reported a failure
    ExecutionFailed {
        /// The tool that failed
        tool_name: String,
        /// Reason for failure
        reason: String,
    },
    /// The invocation exceeded its time allowance
    Timeout {
        /// The tool that timed out
        tool_name: String,
        /// The allowance that was exceeded
        duration: Duration,
    },
    /// A human (or the absence of one) refused the invocation
    ApprovalDenied {
        /// The sensitive tool
        tool_name: String,
        /// Why the approval was not granted
        reason: String,
    },
    /// Internal error
    Internal {
        /// Description of the internal error
        message: String,
    },
}

impl ToolError {
    /// Creates a new ToolError with the given kind.
    #[must_use]
    pub fn new(kind: ToolErrorKind) -> Self {
        Self {
            invocation_id: None,
            kind: Box::new(kind),
        }
    }

    /// Attaches the invocation this error was raised for.
    #[must_use]
    pub fn for_invocation(mut self, invocation_id: InvocationId) -> Self {
        self.invocation_id = Some(invocation_id);
        self
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &ToolErrorKind {
        &self.kind
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(tool_name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound {
            tool_name: tool_name.into(),
        })
    }

    /// Creates an already registered error.
    #[must_use]
    pub fn already_registered(tool_name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::AlreadyRegistered {
            tool_name: tool_name.into(),
        })
    }

    /// Creates a missing parameter error.
    #[must_use]
    pub fn missing_parameter(tool_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::MissingParameter {
            tool_name: tool_name.into(),
            field: field.into(),
        })
    }

    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(
        tool_name: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(ToolErrorKind::TypeMismatch {
            tool_name: tool_name.into(),
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        })
    }

    /// Creates a validation failed error.
    #[must_use]
    pub fn validation_failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ValidationFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an execution failed error.
    #[must_use]
    pub fn execution_failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(tool_name: impl Into<String>, duration: Duration) -> Self {
        Self::new(ToolErrorKind::Timeout {
            tool_name: tool_name.into(),
            duration,
        })
    }

    /// Creates an approval denied error.
    #[must_use]
    pub fn approval_denied(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ApprovalDenied {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal {
            message: message.into(),
        })
    }

    /// Returns the tool name the error refers to, if any.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        match self.kind.as_ref() {
            ToolErrorKind::NotFound { tool_name }
            | ToolErrorKind::AlreadyRegistered { tool_name }
            | ToolErrorKind::MissingParameter { tool_name, .. }
            | ToolErrorKind::TypeMismatch { tool_name, .. }
            | ToolErrorKind::ValidationFailed { tool_name, .. }
            | ToolErrorKind::ExecutionFailed { tool_name, .. }
            | ToolErrorKind::Timeout { tool_name, .. }
            | ToolErrorKind::ApprovalDenied { tool_name, .. } => Some(tool_name),
            ToolErrorKind::Internal { .. } => None,
        }
    }

    /// Returns true if this error indicates the tool was not found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::NotFound { .. })
    }

    /// Returns true if this error indicates the tool is already registered.
    #[must_use]
    pub fn is_already_registered(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::AlreadyRegistered { .. })
    }

    /// Returns true for any schema validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            *self.kind,
            ToolErrorKind::MissingParameter { .. }
                | ToolErrorKind::TypeMismatch { .. }
                | ToolErrorKind::ValidationFailed { .. }
        )
    }

    /// Returns true if the invocation timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::Timeout { .. })
    }

    /// Returns true if approval was refused.
    #[must_use]
    pub fn is_approval_denied(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::ApprovalDenied { .. })
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref invocation_id) = self.invocation_id {
            write!(f, "[{}] ", invocation_id)?;
        }

        match self.kind.as_ref() {
            ToolErrorKind::NotFound { tool_name } => {
                write!(
                    f,
                    "tool '{}' not found; verify the tool is registered",
                    tool_name
                )
            }
            ToolErrorKind::AlreadyRegistered { tool_name } => {
                write!(
                    f,
                    "tool '{}' is already registered; unregister it first or use a different name",
                    tool_name
                )
            }
            ToolErrorKind::MissingParameter { tool_name, field } => {
                write!(
                    f,
                    "tool '{}' validation failed: missing required parameter '{}'",
                    tool_name, field
                )
            }
            ToolErrorKind::TypeMismatch {
                tool_name,
                field,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "tool '{}' validation failed: parameter '{}' expected {} but got {}",
                    tool_name, field, expected, actual
                )
            }
            ToolErrorKind::ValidationFailed { tool_name, reason } => {
                write!(
                    f,
                    "tool '{}' validation failed: {}; check the input arguments",
                    tool_name, reason
                )
            }
            ToolErrorKind::ExecutionFailed { tool_name, reason } => {
                write!(f, "tool '{}' execution failed: {}", tool_name, reason)
            }
            ToolErrorKind::Timeout {
                tool_name,
                duration,
            } => {
                write!(
                    f,
                    "tool '{}' timed out after {:.3} seconds",
                    tool_name,
                    duration.as_secs_f64()
                )
            }
            ToolErrorKind::ApprovalDenied { tool_name, reason } => {
                write!(
                    f,
                    "tool '{}' requires human approval but was denied: {}",
                    tool_name, reason
                )
            }
            ToolErrorKind::Internal { message } => {
                write!(f, "internal tool error: {}", message)
            }
        }
    }
}

impl std::error::Error for ToolError {}
