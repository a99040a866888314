//! Error types for the query pipeline.

use std::fmt;

use thiserror::Error;

/// Classification of an executor-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorKind {
    /// The operation references a capability the cluster client does not expose.
    ApiSurfaceMismatch,
    /// The operation ran cleanly but left the output slot unbound.
    NoResult,
    /// Any other runtime error while talking to the control plane.
    RuntimeError,
}

impl fmt::Display for ExecutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExecutionErrorKind::ApiSurfaceMismatch => "unsupported operation",
            ExecutionErrorKind::NoResult => "no result",
            ExecutionErrorKind::RuntimeError => "runtime error",
        };
        f.write_str(label)
    }
}

/// Failure taxonomy for the synthesize → execute → format pipeline.
///
/// Each variant is local to one stage boundary; the message is forwarded
/// verbatim into the HTTP error body.
#[derive(Error, Debug)]
pub enum AskubeError {
    #[error("invalid request: {0}")]
    Input(String),

    #[error("client unavailable: {0}")]
    ClientUnavailable(String),

    #[error("command synthesis failed: {0}")]
    Synthesis(String),

    #[error("execution failed ({kind}): {message}")]
    Execution {
        kind: ExecutionErrorKind,
        message: String,
    },

    #[error("answer formatting failed: {0}")]
    Formatting(String),
}

impl AskubeError {
    pub fn execution(kind: ExecutionErrorKind, message: impl Into<String>) -> Self {
        AskubeError::Execution {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status the error maps to. Only malformed input is the caller's
    /// fault; everything else is a 500 with the message text.
    pub fn http_status(&self) -> u16 {
        match self {
            AskubeError::Input(_) => 400,
            _ => 500,
        }
    }
}
