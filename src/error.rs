//! Unified error handling for pacekeeper.
//!
//! Limiter operations return [`LimiterError`]; the persistence adapter returns
//! [`PersistenceError`]. Persistence failures never reach limiter callers:
//! reads fall back to empty state and writes are logged and counted.

use thiserror::Error;

// ============================================================================
// Limiter Errors (caller-facing)
// ============================================================================

/// Errors returned to callers of the admission controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("account not registered: {0}")]
    UnregisteredAccount(String),
}

impl LimiterError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnregisteredAccount(_) => "unregistered_account",
        }
    }
}

/// Result type for limiter operations.
pub type LimiterResult<T> = Result<T, LimiterError>;

// ============================================================================
// Persistence Errors (adapter-facing)
// ============================================================================

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Injected by [`crate::persistence::MemoryStore`] to exercise failure paths.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl PersistenceError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Unavailable(_) => "unavailable",
        }
    }
}
