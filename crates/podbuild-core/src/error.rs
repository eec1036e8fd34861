//! Error taxonomy for pod synthesis and local execution.

use std::fmt;

/// Machine-readable reason attached to a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationReason {
    MissingUrl,
    MissingRevision,
    MissingLocation,
    OmitName,
    DuplicateVolumeName,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationReason::MissingUrl => "MissingUrl",
            ValidationReason::MissingRevision => "MissingRevision",
            ValidationReason::MissingLocation => "MissingLocation",
            ValidationReason::OmitName => "OmitName",
            ValidationReason::DuplicateVolumeName => "DuplicateVolumeName",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The build is malformed. Never retried; no pod is produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct ValidationError {
    pub reason: ValidationReason,
    pub message: String,
}

impl ValidationError {
    pub fn new(reason: ValidationReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// Failures of the service account / secret lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("service account {namespace}/{name} not found")]
    ServiceAccountNotFound { namespace: String, name: String },

    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },

    #[error("lookup backend error: {0}")]
    Backend(String),
}

/// Errors produced while converting a build into a pod.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("credential lookup failed: {0}")]
    Lookup(#[from] LookupError),
}

impl BuildError {
    /// The validation error, when the build itself was at fault.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            BuildError::Validation(err) => Some(err),
            BuildError::Lookup(_) => None,
        }
    }
}

/// Errors of a sequence executor itself, as opposed to failing steps.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("pod {0} has no init containers to run")]
    EmptySequence(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
