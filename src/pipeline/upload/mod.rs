//! Upload task queue: validation, persistence, concurrency cap, retry.

pub mod error;
pub mod queue;
pub mod store;
pub mod types;

pub use error::UploadError;
pub use queue::UploadQueue;
pub use store::{JsonFileStore, MemoryStore, TaskStore};
pub use types::{Document, Priority, UploadConfig, UploadEvent, UploadStatus, UploadTask};
