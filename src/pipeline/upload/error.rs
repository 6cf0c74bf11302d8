//! Upload-queue error types.
//!
//! Separate from the router's and monitor's errors so each component keeps
//! its own retry semantics at the type level.

use thiserror::Error;
use uuid::Uuid;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("upload failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        source: TransportError,
    },

    #[error("task {0} was cancelled")]
    Cancelled(Uuid),

    #[error("failed to persist task state: {0}")]
    Persistence(String),

    #[error("malformed upload response: {0}")]
    BadResponse(String),
}

impl UploadError {
    /// Short, user-actionable recovery hint shown alongside the error.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Pick a supported file under the size limit and try again.",
            Self::Transport(e) | Self::RetriesExhausted { source: e, .. } => {
                e.recovery_suggestion()
            }
            Self::Cancelled(_) => "The upload was cancelled. Submit the document again if needed.",
            Self::Persistence(_) => "Free up storage space on this device and try again.",
            Self::BadResponse(_) => "The service returned an unexpected answer. Try again later.",
        }
    }
}
