//! Types for remote job status observation.
//!
//! A `ProcessingStatus` is the server-side job state as seen by the monitor.
//! It is related to but distinct from an `UploadTask`'s status: the task
//! tracks getting bytes to the server, this tracks what the server does with
//! them afterwards.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::routing::types::Biomarker;

// ═══════════════════════════════════════════
// Job status & stage
// ═══════════════════════════════════════════

/// Coarse remote job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Uploading,
    Processing,
    Analyzing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Finer processing phase, used to tune the polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Queued,
    Ocr,
    Classification,
    Analysis,
    Finalizing,
    #[serde(other)]
    Unknown,
}

impl ProcessingStage {
    /// Compute-intensive stages finish in bursts; poll them faster.
    pub fn is_compute_intensive(&self) -> bool {
        matches!(self, Self::Ocr | Self::Analysis)
    }
}

// ═══════════════════════════════════════════
// Wire payload & observed status
// ═══════════════════════════════════════════

/// Extraction output attached to a completed job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<Biomarker>,
    pub confidence: Option<f32>,
}

/// Body of `GET /status/{jobId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayload {
    pub status: JobStatus,
    pub stage: Option<ProcessingStage>,
    pub progress: Option<f32>,
    pub estimated_seconds_remaining: Option<u32>,
    pub error_message: Option<String>,
    pub result: Option<JobResult>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One observed snapshot of a remote job. The monitor keeps only the latest
/// snapshot per job; no history is retained.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingStatus {
    pub job_id: String,
    pub status: JobStatus,
    pub stage: ProcessingStage,
    pub progress: f32,
    pub estimated_seconds_remaining: Option<u32>,
    pub error_message: Option<String>,
    pub result: Option<JobResult>,
    pub last_updated: DateTime<Utc>,
}

impl ProcessingStatus {
    pub fn from_payload(job_id: &str, payload: StatusPayload) -> Self {
        Self {
            job_id: job_id.to_string(),
            status: payload.status,
            stage: payload.stage.unwrap_or(ProcessingStage::Unknown),
            progress: payload.progress.unwrap_or(0.0).clamp(0.0, 1.0),
            estimated_seconds_remaining: payload.estimated_seconds_remaining,
            error_message: payload.error_message,
            result: payload.result,
            last_updated: payload.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

// ═══════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════

/// Status monitor configuration with OCR/analysis-job defaults.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Overall observation deadline; breaching it fails the sequence with
    /// a distinct timeout error.
    pub deadline: Duration,
    /// Poll interval during compute-intensive stages.
    pub fast_interval: Duration,
    /// Poll interval otherwise.
    pub slow_interval: Duration,
    /// `current_status` serves the cache while it is younger than this.
    pub staleness: Duration,
    /// First backoff after a transient poll failure; doubles per failure.
    pub error_backoff_base: Duration,
    /// Backoff ceiling.
    pub error_backoff_cap: Duration,
    /// Consecutive transient failures tolerated before the sequence fails.
    pub max_poll_errors: u32,
    /// Per-poll transport timeout.
    pub request_timeout: Duration,
    /// Status endpoint path prefix.
    pub status_path: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(600),
            fast_interval: Duration::from_secs(1),
            slow_interval: Duration::from_secs(2),
            staleness: Duration::from_secs(30),
            error_backoff_base: Duration::from_secs(1),
            error_backoff_cap: Duration::from_secs(30),
            max_poll_errors: 5,
            request_timeout: Duration::from_secs(15),
            status_path: "/status".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Same policy under a shorter overall deadline (for quick jobs such as
    /// thumbnail-only scans).
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Default::default()
        }
    }

    /// Backoff before transient-error poll attempt `failures` (1-based).
    pub fn error_backoff(&self, failures: u32) -> Duration {
        let doubled = self.error_backoff_base * 2u32.saturating_pow(failures.saturating_sub(1));
        doubled.min(self.error_backoff_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::Analyzing.is_terminal());
        assert!(!JobStatus::Uploading.is_terminal());
    }

    #[test]
    fn compute_intensive_stages_poll_fast() {
        assert!(ProcessingStage::Ocr.is_compute_intensive());
        assert!(ProcessingStage::Analysis.is_compute_intensive());
        assert!(!ProcessingStage::Queued.is_compute_intensive());
        assert!(!ProcessingStage::Finalizing.is_compute_intensive());
        assert!(!ProcessingStage::Unknown.is_compute_intensive());
    }

    #[test]
    fn payload_parses_camel_case() {
        let json = r#"{
            "status": "analyzing",
            "stage": "analysis",
            "progress": 0.62,
            "estimatedSecondsRemaining": 18,
            "updatedAt": "2026-03-01T10:00:00Z"
        }"#;
        let payload: StatusPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.status, JobStatus::Analyzing);
        assert_eq!(payload.stage, Some(ProcessingStage::Analysis));
        assert_eq!(payload.estimated_seconds_remaining, Some(18));
    }

    #[test]
    fn unknown_stage_tag_parses_as_unknown() {
        let json = r#"{"status":"processing","stage":"deskew"}"#;
        let payload: StatusPayload = serde_json::from_str(json).unwrap();
        assert_eq!(payload.stage, Some(ProcessingStage::Unknown));
    }

    #[test]
    fn completed_payload_carries_result() {
        let json = r#"{
            "status": "completed",
            "progress": 1.0,
            "result": {"text": "Hemoglobin: 13.5 g/dL", "entities": [], "confidence": 0.93}
        }"#;
        let payload: StatusPayload = serde_json::from_str(json).unwrap();
        let result = payload.result.unwrap();
        assert!(result.text.contains("Hemoglobin"));
        assert_eq!(result.confidence, Some(0.93));
    }

    #[test]
    fn from_payload_clamps_progress() {
        let payload: StatusPayload =
            serde_json::from_str(r#"{"status":"processing","progress":1.7}"#).unwrap();
        let status = ProcessingStatus::from_payload("job-1", payload);
        assert_eq!(status.progress, 1.0);
        assert_eq!(status.stage, ProcessingStage::Unknown);
    }

    #[test]
    fn error_backoff_doubles_to_cap() {
        let config = MonitorConfig::default();
        assert_eq!(config.error_backoff(1), Duration::from_secs(1));
        assert_eq!(config.error_backoff(2), Duration::from_secs(2));
        assert_eq!(config.error_backoff(5), Duration::from_secs(16));
        assert_eq!(config.error_backoff(6), Duration::from_secs(30));
        assert_eq!(config.error_backoff(12), Duration::from_secs(30));
    }

    #[test]
    fn default_deadline_is_ten_minutes() {
        assert_eq!(MonitorConfig::default().deadline, Duration::from_secs(600));
    }
}
