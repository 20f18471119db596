//! Code generation errors.
//!
//! Two kinds matter to callers:
//!
//! - [`CodegenError::User`]: the input cannot be compiled (bad unit name,
//!   unsupported or misplaced construct). Aborts the current request only.
//! - [`CodegenError::Bug`]: a generator component violated an invariant it
//!   owns. Never recovered; it signals a defect in the generator, not the
//!   input.
//!
//! There is no partial-success mode: any error discards the whole unit.

use std::path::PathBuf;

/// Error raised while generating a compilation unit.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// The input is malformed or uses an unsupported construct.
    #[error("{message}")]
    User { message: String, line: Option<u32> },

    /// Internal consistency violation inside the generator.
    #[error("internal error (bug): {0}")]
    Bug(String),

    /// A file needed during generation could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A pre-parsed tree file is not valid JSON for the tree format.
    #[error("invalid parse tree in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl CodegenError {
    /// A user-facing error without line information.
    pub fn user(message: impl Into<String>) -> Self {
        CodegenError::User {
            message: message.into(),
            line: None,
        }
    }

    /// A user-facing error at `line` (0 means unknown).
    pub fn user_at(message: impl Into<String>, line: u32) -> Self {
        CodegenError::User {
            message: message.into(),
            line: (line != 0).then_some(line),
        }
    }

    /// An internal consistency violation.
    pub fn bug(message: impl Into<String>) -> Self {
        CodegenError::Bug(message.into())
    }

    /// Whether this error indicates a generator defect.
    pub fn is_bug(&self) -> bool {
        matches!(self, CodegenError::Bug(_))
    }

    /// Source line the error refers to, if known.
    pub fn line(&self) -> Option<u32> {
        match self {
            CodegenError::User { line, .. } => *line,
            _ => None,
        }
    }
}

/// Result alias for code generation.
pub type CodegenResult<T> = Result<T, CodegenError>;
