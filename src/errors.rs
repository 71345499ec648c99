use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

/// Errors raised while turning an untrusted query payload into a `CompiledQuery`.
///
/// Every variant carries `at`, a JSON pointer into the query document that
/// locates the first problem found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    // The payload was not JSON at all
    #[error("invalid query json: {0}")]
    InvalidJson(String),

    // Right JSON, wrong shape
    #[error("malformed query at `{at}`: {reason}")]
    Malformed { at: String, reason: String },

    #[error("unknown operator `{op}` at `{at}`")]
    UnknownOperator { at: String, op: String },

    // Identifier is neither `$name` nor `ext$name`
    #[error("invalid operator `{op}` at `{at}`: {reason}")]
    InvalidOperator { at: String, op: String, reason: String },

    #[error("invalid pointer `{pointer}` at `{at}`: {reason}")]
    InvalidPointer {
        at: String,
        pointer: String,
        reason: String,
    },

    #[error("operator `{op}` at `{at}` takes {expected} operand(s), got {found}")]
    Arity {
        at: String,
        op: String,
        expected: String,
        found: usize,
    },

    #[error("invalid select at `{at}`: {reason}")]
    InvalidSelect { at: String, reason: String },

    #[error("query at `{at}` exceeds the maximum nesting depth of {limit}")]
    TooDeep { at: String, limit: usize },
}

impl CompileError {
    /// Location inside the query document, if the error has one.
    pub fn location(&self) -> Option<&str> {
        match self {
            CompileError::InvalidJson(_) => None,
            CompileError::Malformed { at, .. }
            | CompileError::UnknownOperator { at, .. }
            | CompileError::InvalidOperator { at, .. }
            | CompileError::InvalidPointer { at, .. }
            | CompileError::Arity { at, .. }
            | CompileError::InvalidSelect { at, .. }
            | CompileError::TooDeep { at, .. } => Some(at),
        }
    }
}

/// Startup-time errors from extension operator registration.
///
/// These indicate a deployment defect and are not meant to be recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("operator `{0}` is already registered")]
    Duplicate(String),

    #[error("invalid extension operator identifier `{id}`: {reason}")]
    InvalidIdentifier { id: String, reason: String },
}

// Type alias for results that use `CompileError` as the error type
pub type Result<T> = std::result::Result<T, CompileError>;
