//! The module contains the errors the engine can return.
//!
//! - [`StoreError`] is raised by a [`LedgerStore`] implementation (or by the
//!   engine while decoding the rows it returned).
//! - [`EngineError`] is what [`Engine`] hands back to the caller of a whole
//!   message.
//!
//! Invalid user input is never an error: it is a [`Command::Invalid`].
//!
//!  [`LedgerStore`]: crate::LedgerStore
//!  [`Engine`]: crate::Engine
//!  [`Command::Invalid`]: crate::Command::Invalid
use std::time::Duration;

use thiserror::Error;

/// Failures of the external ledger store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document \"{0}\" not found")]
    DocumentNotFound(String),
    #[error("sheet \"{0}\" not found")]
    SheetNotFound(String),
    #[error("sheet \"{sheet}\" row {row}: {reason}")]
    MalformedRow {
        sheet: String,
        row: usize,
        reason: String,
    },
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Backend(_))
    }
}

/// Engine custom errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid engine configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(StoreError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(StoreError::Backend("503".to_string()).is_retryable());
        assert!(!StoreError::SheetNotFound("Categories".to_string()).is_retryable());
        assert!(
            !StoreError::MalformedRow {
                sheet: "2026-10".to_string(),
                row: 2,
                reason: "bad amount".to_string(),
            }
            .is_retryable()
        );
    }
}
