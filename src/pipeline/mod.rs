//! Document processing pipeline: upload queue, extraction routing, remote
//! job monitoring, and the façade that ties them together.

pub mod monitor;
pub mod processor;
pub mod routing;
pub mod upload;

pub use processor::{DocumentPipeline, PipelineUpdate, Submission};
