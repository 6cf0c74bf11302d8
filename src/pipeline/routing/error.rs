//! Router-specific error types.

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum RouterError {
    /// No extraction strategy can run: network down with local disabled,
    /// or remote-only mode with the remote strategy demoted. Fatal — never
    /// retried automatically.
    #[error("no viable extraction strategy: {0}")]
    StrategyUnavailable(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("remote extraction failed: {0}")]
    Remote(String),

    #[error("local extraction failed: {0}")]
    Local(String),
}

impl RouterError {
    /// Short, user-actionable recovery hint shown alongside the error.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::StrategyUnavailable(_) => {
                "Connect to the internet and try again, or retry later."
            }
            Self::Transport(e) => e.recovery_suggestion(),
            Self::Remote(_) => "The analysis service had trouble with this document. Try again.",
            Self::Local(_) => {
                "On-device reading failed. Retake the photo with better lighting and try again."
            }
        }
    }
}
