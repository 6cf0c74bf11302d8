//! Core types for the upload task queue.
//!
//! An `UploadTask` tracks one document's journey to the server — independent
//! of server-side processing, which the status monitor tracks separately. A
//! task can be `Completed` (bytes delivered, job accepted) while the remote
//! job is still analyzing.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::UploadError;

// ═══════════════════════════════════════════
// Document
// ═══════════════════════════════════════════

/// A captured lab-report file queued for upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub file_name: String,
    pub mime_type: String,
    /// Raw file content. Persisted as base64, not a JSON byte array: a
    /// multi-MB scan must not balloon the task-set file.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text).map_err(serde::de::Error::custom)
    }
}

impl Document {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Build a document, inferring the MIME type from the file extension.
    pub fn from_file_name(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_guess::from_path(&file_name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// ═══════════════════════════════════════════
// Priority & Status
// ═══════════════════════════════════════════

/// Dequeue priority. Within a tier, tasks run FIFO by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    /// Rank for dispatch ordering (higher runs first).
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
        }
    }
}

/// Upload task state machine:
/// `pending → uploading → {completed | retrying | failed}`,
/// `retrying → uploading`, `cancelled` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Retrying,
    Completed,
    Failed,
    Cancelled,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Upload Task
// ═══════════════════════════════════════════

/// One document's end-to-end upload lifecycle.
///
/// Owned exclusively by the queue, mutated only by its worker loop, and
/// persisted on every mutation so a process suspension leaves recoverable
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: Uuid,
    pub document: Document,
    pub priority: Priority,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub last_error: Option<String>,
    /// Remote job accepted for this upload, once the server answers.
    pub job_id: Option<String>,
}

impl UploadTask {
    pub fn new(document: Document, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            priority,
            status: UploadStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_count: 0,
            last_error: None,
            job_id: None,
        }
    }
}

/// Snapshot published on the queue's event channel after every transition.
/// Replaces per-task delegate callbacks: consumers subscribe instead of
/// being invoked.
#[derive(Debug, Clone, Serialize)]
pub struct UploadEvent {
    pub task_id: Uuid,
    pub status: UploadStatus,
    pub retry_count: u32,
    pub job_id: Option<String>,
    pub error: Option<String>,
    /// Recovery hint for the user, set on terminal failures.
    pub suggestion: Option<String>,
    pub at: DateTime<Utc>,
}

// ═══════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════

/// Upload queue configuration with production defaults.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Hard ceiling on document size.
    pub max_file_bytes: u64,
    /// MIME types the backend accepts.
    pub allowed_mime_types: Vec<String>,
    /// Concurrent in-flight uploads (a retrying task holds its slot).
    pub max_concurrent: usize,
    /// Retry budget for retryable transport failures.
    pub max_retries: u32,
    /// First retry delay; doubles on each subsequent attempt.
    pub retry_base_delay: Duration,
    /// Per-attempt transport timeout. Independent of the status monitor's
    /// overall processing deadline.
    pub transport_timeout: Duration,
    /// Upload endpoint path.
    pub upload_path: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            allowed_mime_types: vec![
                "application/pdf".to_string(),
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/tiff".to_string(),
                "image/heic".to_string(),
            ],
            max_concurrent: 3,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(10),
            transport_timeout: Duration::from_secs(30),
            upload_path: "/upload".to_string(),
        }
    }
}

impl UploadConfig {
    /// Validate a document before any network work.
    pub fn validate(&self, document: &Document) -> Result<(), UploadError> {
        if document.bytes.is_empty() {
            return Err(UploadError::Validation("document is empty".to_string()));
        }
        if document.size_bytes() > self.max_file_bytes {
            return Err(UploadError::Validation(format!(
                "document is {} bytes, limit is {} bytes",
                document.size_bytes(),
                self.max_file_bytes
            )));
        }
        if !self
            .allowed_mime_types
            .iter()
            .any(|m| m == &document.mime_type)
        {
            return Err(UploadError::Validation(format!(
                "unsupported document type: {}",
                document.mime_type
            )));
        }
        Ok(())
    }

    /// Backoff delay before retry attempt `retry_count` (1-based),
    /// doubling from the base delay.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        self.retry_base_delay * 2u32.saturating_pow(retry_count.saturating_sub(1))
    }
}
