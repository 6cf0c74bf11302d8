//! Crate-level error type.
//!
//! Each pipeline stage keeps its own error enum; this wrapper exists for
//! callers that drive the whole pipeline through `DocumentPipeline` and want
//! a single error surface.

use thiserror::Error;

use crate::pipeline::monitor::MonitorError;
use crate::pipeline::routing::RouterError;
use crate::pipeline::upload::UploadError;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

impl PipelineError {
    /// Short, user-actionable recovery hint shown alongside the error.
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Upload(e) => e.recovery_suggestion(),
            Self::Router(e) => e.recovery_suggestion(),
            Self::Monitor(e) => e.recovery_suggestion(),
        }
    }
}
