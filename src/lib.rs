//! Labport — lab report intake library.
//!
//! Takes a document from the user's hand to structured biomarkers: an upload
//! task queue with retry and persistence, an extraction router that picks
//! between the remote analysis service and an on-device engine, a status
//! monitor that follows remote processing jobs, and a façade that drives the
//! whole pipeline behind one task id.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod transport;

pub use error::PipelineError;
pub use pipeline::monitor::{MonitorConfig, MonitorError, ProcessingStatus, StatusMonitor};
pub use pipeline::routing::{
    Biomarker, ExtractionResult, ExtractionRouter, RouterConfig, RouterError, Strategy,
};
pub use pipeline::upload::{
    Document, Priority, UploadConfig, UploadError, UploadQueue, UploadStatus,
};
pub use pipeline::{DocumentPipeline, PipelineUpdate, Submission};
pub use transport::{HttpTransport, TransportClient, TransportError};

/// Install the global tracing subscriber. Honours `RUST_LOG` when set,
/// otherwise uses the crate default filter.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
