//! Settlement failure classification.

use thiserror::Error;

/// Outcome classification for a failed settlement call.
///
/// Network trouble and remote server errors are worth redelivering; a
/// rejection from the processor is final.
#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    /// The processor could not be reached.
    #[error("settlement processor unreachable: {0}")]
    Unreachable(String),

    /// The processor answered with a server-side error.
    #[error("settlement processor error: {0}")]
    RemoteServer(String),

    /// The processor rejected the charge.
    #[error("settlement rejected: {0}")]
    Rejected(String),
}

impl SettlementError {
    /// Returns true if a retried call could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SettlementError::Unreachable(_) | SettlementError::RemoteServer(_)
        )
    }
}
