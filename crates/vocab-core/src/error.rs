//! The error taxonomy the rest of the engine propagates through.

use thiserror::Error;

/// The one vocabulary of error kinds the engine ever returns to a caller.
///
/// Every variant maps to exactly one of the machine-readable kinds a transport
/// layer would surface; see each variant's `kind()` mapping below.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("session {session_id} not found")]
    SessionNotFound { session_id: String },

    #[error("user {user_id} not found")]
    UserNotFound { user_id: String },

    #[error("duplicate response for item {item_id} in session {session_id}")]
    Conflict { session_id: String, item_id: i64 },

    #[error("session {session_id} has expired")]
    Gone { session_id: String },

    #[error("no eligible item remains for session {session_id}")]
    PoolExhausted { session_id: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// The machine-readable kind a transport boundary would map to an HTTP status.
/// Kept separate from the `Display` message so the wire never leaks internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Conflict,
    Gone,
    PoolExhausted,
    InvariantViolation,
    PersistenceUnavailable,
    Internal,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::BadRequest(_) => ErrorKind::BadRequest,
            EngineError::SessionNotFound { .. } => ErrorKind::NotFound,
            EngineError::UserNotFound { .. } => ErrorKind::NotFound,
            EngineError::Conflict { .. } => ErrorKind::Conflict,
            EngineError::Gone { .. } => ErrorKind::Gone,
            EngineError::PoolExhausted { .. } => ErrorKind::PoolExhausted,
            EngineError::InvariantViolation(_) => ErrorKind::InvariantViolation,
            EngineError::PersistenceUnavailable(_) => ErrorKind::PersistenceUnavailable,
            EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::PersistenceUnavailable(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
