//! Status-monitor error types.

use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum MonitorError {
    /// The overall observation deadline was breached while the job was still
    /// processing. Distinct from generic failures so the UI can phrase it as
    /// "taking longer than expected" rather than "something went wrong".
    #[error("processing deadline of {}s exceeded", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("status polling failed after {attempts} consecutive errors: {source}")]
    PollRetriesExhausted {
        attempts: u32,
        source: TransportError,
    },
}

impl MonitorError {
    /// Short, user-actionable recovery hint shown alongside the error.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Timeout(_) => {
                "Processing is taking longer than expected. Check back in a few minutes."
            }
            Self::Transport(e) | Self::PollRetriesExhausted { source: e, .. } => {
                e.recovery_suggestion()
            }
        }
    }
}
