// ── Core error types ──
//
// Every failure the orchestrator can report. Collaborator failures are
// already surfaced as notifications by the time a caller sees one of
// these, so inspecting the returned `Result` is optional.

use thiserror::Error;

use crate::backend::BackendError;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Collaborator errors ──────────────────────────────────────────
    #[error("{operation} failed: {message}")]
    BackendCallFailed { operation: String, message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Invalid poll interval: {seconds}s (must be at least 1s)")]
    InvalidInterval { seconds: i64 },

    #[error("A connect/disconnect request is already in progress")]
    ToggleInProgress,

    #[error("The orchestrator has been shut down")]
    ShutDown,

    // ── Input errors ─────────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

impl CoreError {
    pub(crate) fn backend(operation: impl Into<String>, err: &BackendError) -> Self {
        Self::BackendCallFailed {
            operation: operation.into(),
            message: err.message().to_owned(),
        }
    }

    /// `true` for failures reported by a collaborator rather than
    /// rejected locally.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::BackendCallFailed { .. })
    }
}
