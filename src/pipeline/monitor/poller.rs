//! Status monitor — adaptive polling of remote OCR/analysis jobs.
//!
//! `observe` produces a lazy, finite, non-restartable sequence of status
//! snapshots for one job. The sequence ends naturally on a terminal status,
//! or fails exactly once with a timeout or an exhausted poll-retry budget.
//! "Still processing" is an ordinary snapshot here, not an error — the loop
//! checks terminality explicitly instead of catching exceptions per poll.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::transport::{TransportClient, TransportError, TransportRequest};

use super::error::MonitorError;
use super::types::{MonitorConfig, ProcessingStatus, StatusPayload};

/// Buffered snapshots per observation. A stalled subscriber backpressures
/// the poll loop rather than growing memory.
const OBSERVE_CHANNEL_CAPACITY: usize = 16;

/// One emitted (or cached) snapshot, tagged with fetch time for staleness.
struct CacheEntry {
    status: ProcessingStatus,
    fetched_at: Instant,
}

/// Stop signal for one observation. The generation tells an exiting poll
/// loop whether the registered handle is still its own; a later `observe`
/// for the same job replaces the handle, and the old loop must not unhook
/// the replacement on its way out.
struct StopHandle {
    generation: u64,
    tx: watch::Sender<bool>,
}

pub struct StatusMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    config: MonitorConfig,
    transport: Arc<dyn TransportClient>,
    /// Latest snapshot per job. Cleared when monitoring stops.
    cache: Mutex<HashMap<String, CacheEntry>>,
    /// Stop signal per actively observed job. One active observation per
    /// job id; a second `observe` replaces the first's stop handle.
    stops: Mutex<HashMap<String, StopHandle>>,
    /// Monotonic observation counter backing the stop-handle generations.
    observations: AtomicU64,
}

impl StatusMonitor {
    pub fn new(transport: Arc<dyn TransportClient>, config: MonitorConfig) -> Self {
        Self {
            inner: Arc::new(MonitorInner {
                config,
                transport,
                cache: Mutex::new(HashMap::new()),
                stops: Mutex::new(HashMap::new()),
                observations: AtomicU64::new(0),
            }),
        }
    }

    /// Observe a job to completion. The returned receiver yields snapshots
    /// in strictly increasing `last_updated` order, then closes after the
    /// terminal snapshot or a single error.
    ///
    /// Must be called within a Tokio runtime.
    pub fn observe(&self, job_id: &str) -> mpsc::Receiver<Result<ProcessingStatus, MonitorError>> {
        let (tx, rx) = mpsc::channel(OBSERVE_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = watch::channel(false);
        let generation = self.inner.observations.fetch_add(1, Ordering::Relaxed);
        self.inner.stops.lock().unwrap().insert(
            job_id.to_string(),
            StopHandle {
                generation,
                tx: stop_tx,
            },
        );
        tracing::debug!(job_id, "Job observation starting");
        tokio::spawn(poll_loop(
            Arc::clone(&self.inner),
            job_id.to_string(),
            generation,
            tx,
            stop_rx,
        ));
        rx
    }

    /// Observe several jobs independently. No coordination beyond running
    /// each observation on its own.
    pub fn batch_observe(
        &self,
        job_ids: &[String],
    ) -> HashMap<String, mpsc::Receiver<Result<ProcessingStatus, MonitorError>>> {
        job_ids
            .iter()
            .map(|id| (id.clone(), self.observe(id)))
            .collect()
    }

    /// One-shot status fetch. Serves the cached snapshot while it is fresher
    /// than the staleness window, otherwise fetches and refreshes the cache.
    pub async fn current_status(&self, job_id: &str) -> Result<ProcessingStatus, MonitorError> {
        {
            let cache = self.inner.cache.lock().unwrap();
            if let Some(entry) = cache.get(job_id) {
                if entry.fetched_at.elapsed() <= self.inner.config.staleness {
                    return Ok(entry.status.clone());
                }
            }
        }
        let payload = fetch_status(&self.inner, job_id).await?;
        let status = ProcessingStatus::from_payload(job_id, payload);
        self.inner.cache.lock().unwrap().insert(
            job_id.to_string(),
            CacheEntry {
                status: status.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(status)
    }

    /// Cancel the observation for a job and discard its cached state.
    /// Idempotent; unknown jobs are a no-op.
    pub fn stop(&self, job_id: &str) {
        if let Some(handle) = self.inner.stops.lock().unwrap().remove(job_id) {
            let _ = handle.tx.send(true);
            tracing::debug!(job_id, "Job observation stopped");
        }
        self.inner.cache.lock().unwrap().remove(job_id);
    }
}

async fn fetch_status(
    inner: &Arc<MonitorInner>,
    job_id: &str,
) -> Result<StatusPayload, TransportError> {
    let request = TransportRequest::get(
        format!("{}/{}", inner.config.status_path, job_id),
        inner.config.request_timeout,
    );
    inner.transport.send(request).await?.json()
}

async fn poll_loop(
    inner: Arc<MonitorInner>,
    job_id: String,
    generation: u64,
    tx: mpsc::Sender<Result<ProcessingStatus, MonitorError>>,
    mut stop: watch::Receiver<bool>,
) {
    let started = Instant::now();
    let mut consecutive_errors: u32 = 0;
    let mut last_emitted: Option<chrono::DateTime<chrono::Utc>> = None;

    loop {
        let fetch = fetch_status(&inner, &job_id);
        let result = tokio::select! {
            _ = stop.changed() => break,
            result = fetch => result,
        };

        match result {
            Ok(payload) => {
                consecutive_errors = 0;
                let mut status = ProcessingStatus::from_payload(&job_id, payload);
                // Guarantee strictly increasing timestamps within the
                // sequence even when the server repeats or regresses.
                if let Some(prev) = last_emitted {
                    if status.last_updated <= prev {
                        status.last_updated = prev + chrono::Duration::milliseconds(1);
                    }
                }
                last_emitted = Some(status.last_updated);

                inner.cache.lock().unwrap().insert(
                    job_id.clone(),
                    CacheEntry {
                        status: status.clone(),
                        fetched_at: Instant::now(),
                    },
                );

                let terminal = status.status.is_terminal();
                let interval = if status.stage.is_compute_intensive() {
                    inner.config.fast_interval
                } else {
                    inner.config.slow_interval
                };
                if terminal {
                    tracing::debug!(job_id = %job_id, status = %status.status, "Job reached terminal status");
                }
                if tx.send(Ok(status)).await.is_err() {
                    break; // subscriber gone
                }
                if terminal {
                    break;
                }
                if started.elapsed() >= inner.config.deadline {
                    tracing::warn!(job_id = %job_id, "Job observation deadline exceeded");
                    let _ = tx.send(Err(MonitorError::Timeout(inner.config.deadline))).await;
                    break;
                }
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            Err(e) if e.is_retryable() => {
                consecutive_errors += 1;
                tracing::debug!(
                    job_id = %job_id,
                    error = %e,
                    consecutive_errors,
                    "Transient status poll failure"
                );
                if consecutive_errors >= inner.config.max_poll_errors {
                    let _ = tx
                        .send(Err(MonitorError::PollRetriesExhausted {
                            attempts: consecutive_errors,
                            source: e,
                        }))
                        .await;
                    break;
                }
                if started.elapsed() >= inner.config.deadline {
                    let _ = tx.send(Err(MonitorError::Timeout(inner.config.deadline))).await;
                    break;
                }
                let backoff = inner.config.error_backoff(consecutive_errors);
                tokio::select! {
                    _ = stop.changed() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
            Err(e) => {
                let _ = tx.send(Err(MonitorError::Transport(e))).await;
                break;
            }
        }
    }
    // Unhook only our own stop handle; a newer observation for this job
    // may have replaced it.
    let mut stops = inner.stops.lock().unwrap();
    if stops.get(&job_id).is_some_and(|h| h.generation == generation) {
        stops.remove(&job_id);
    }
}
