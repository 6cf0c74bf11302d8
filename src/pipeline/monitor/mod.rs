//! Status monitor: adaptive polling of remote processing jobs.

pub mod error;
pub mod poller;
pub mod types;

pub use error::MonitorError;
pub use poller::StatusMonitor;
pub use types::{JobResult, JobStatus, MonitorConfig, ProcessingStage, ProcessingStatus};
