//! Error types and exit code mapping for kdecomp.
//!
//! `DecompileError` is the single error type surfaced to callers of the
//! loader and the CLI. Subsystem errors (signature parsing, I/O, JSON) are
//! bridged into it with `From` impls.
//!
//! Most problems the reconstruction layer meets are *not* errors: conflicting
//! inner-class claims, failed anonymous-class verification, and per-method
//! reconstruction failures are logged and replaced by a fallback. Only
//! conditions that prevent producing any output reach this type.

use std::fmt;

use thiserror::Error;

use crate::signature::SignatureError;

// ============================================================================
// Exit Codes
// ============================================================================

/// Stable exit codes for the `kdecomp` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitStatus {
    /// Bad input from the caller (unknown option, malformed options file).
    InvalidArguments = 2,
    /// A requested class is not part of the loaded class set.
    ClassNotFound = 3,
    /// Reading inputs or writing outputs failed.
    IoError = 4,
    /// Bugs and unexpected state.
    InternalError = 10,
}

impl ExitStatus {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for loading class sets and driving emission.
#[derive(Debug, Error)]
pub enum DecompileError {
    /// Invalid arguments or options.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The class is not in the loaded class set.
    #[error("class not found: {name}")]
    ClassNotFound { name: String },

    /// A descriptor or generic signature could not be parsed.
    #[error("malformed type in {owner}: {source}")]
    MalformedType {
        owner: String,
        #[source]
        source: SignatureError,
    },

    /// I/O error while reading a class-set dump or writing output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl DecompileError {
    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DecompileError::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid-arguments error.
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        DecompileError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Map this error to the binary's exit status.
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            DecompileError::InvalidArguments { .. } | DecompileError::Json(_) => {
                ExitStatus::InvalidArguments
            }
            DecompileError::ClassNotFound { .. } => ExitStatus::ClassNotFound,
            DecompileError::Io(_) => ExitStatus::IoError,
            DecompileError::MalformedType { .. } | DecompileError::Internal { .. } => {
                ExitStatus::InternalError
            }
        }
    }

    /// Numeric exit code for this error.
    pub fn exit_code(&self) -> u8 {
        self.exit_status().code()
    }
}

/// Result type for fallible loader and driver operations.
pub type DecompileResult<T> = Result<T, DecompileError>;
