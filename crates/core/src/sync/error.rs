//! Provider fetch errors.

use finsync_shared::AppError;
use thiserror::Error;

/// A provider call failed. The whole batch is abandoned and retried on the
/// next scheduled cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network or transport failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The call did not finish within the configured bound.
    #[error("Provider call timed out after {0}s")]
    Timeout(u64),

    /// The provider rejected the request.
    #[error("Provider rejected request ({code}): {message}")]
    Rejected {
        /// Provider error code.
        code: String,
        /// Provider error message.
        message: String,
    },

    /// The response could not be decoded.
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "FETCH_TRANSPORT",
            Self::Timeout(_) => "FETCH_TIMEOUT",
            Self::Rejected { .. } => "FETCH_REJECTED",
            Self::Malformed(_) => "FETCH_MALFORMED",
        }
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        Self::ExternalService(err.to_string())
    }
}
