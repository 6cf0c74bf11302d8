//! Extraction router — decides remote vs. local extraction per document.
//!
//! Selection is a pure scoring decision over document size, MIME affinity,
//! network reachability and rolling remote quality; execution goes through
//! pluggable backends; outcomes feed back through `record_outcome`. A
//! strategy that fails repeatedly is temporarily demoted until it succeeds
//! again.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::pipeline::upload::types::Document;
use crate::transport::{AlwaysReachable, ReachabilityProbe};

use super::entities;
use super::error::RouterError;
use super::metrics::StrategyMetrics;
use super::types::{
    ExtractionAttemptMetric, ExtractionResult, RawExtraction, RouterConfig, Strategy,
};

/// Remote extraction backend (the upload + processing service).
#[async_trait]
pub trait RemoteExtraction: Send + Sync {
    async fn extract(&self, document: &Document) -> Result<RawExtraction, RouterError>;
}

/// On-device extraction engine. Absent on builds that do not ship it.
#[async_trait]
pub trait LocalExtractionEngine: Send + Sync {
    async fn extract(&self, document: &Document) -> Result<RawExtraction, RouterError>;
}

pub struct ExtractionRouter {
    config: RouterConfig,
    reachability: Arc<dyn ReachabilityProbe>,
    remote: Arc<dyn RemoteExtraction>,
    local: Option<Arc<dyn LocalExtractionEngine>>,
    metrics: Mutex<StrategyMetrics>,
}

impl ExtractionRouter {
    pub fn new(
        remote: Arc<dyn RemoteExtraction>,
        local: Option<Arc<dyn LocalExtractionEngine>>,
        config: RouterConfig,
    ) -> Self {
        Self::with_reachability(remote, local, Arc::new(AlwaysReachable), config)
    }

    pub fn with_reachability(
        remote: Arc<dyn RemoteExtraction>,
        local: Option<Arc<dyn LocalExtractionEngine>>,
        reachability: Arc<dyn ReachabilityProbe>,
        config: RouterConfig,
    ) -> Self {
        let metrics = Mutex::new(StrategyMetrics::new(config.metrics_window));
        Self {
            config,
            reachability,
            remote,
            local,
            metrics,
        }
    }

    /// Pick the extraction strategy for a document. Pure decision: reads
    /// reachability and metrics, mutates nothing.
    pub fn select_strategy(&self, document: &Document) -> Result<Strategy, RouterError> {
        let local_viable = !self.config.remote_only && self.local.is_some();
        let (remote_demoted, local_demoted, remote_quality) = {
            let metrics = self.metrics.lock().unwrap();
            (
                metrics.consecutive_failures(Strategy::Remote) >= self.config.failure_threshold,
                metrics.consecutive_failures(Strategy::Local) >= self.config.failure_threshold,
                metrics
                    .rolling_quality(Strategy::Remote)
                    .unwrap_or(self.config.default_remote_quality),
            )
        };

        if !self.reachability.is_reachable() {
            if local_viable && !local_demoted {
                return Ok(Strategy::Local);
            }
            return Err(RouterError::StrategyUnavailable(
                "network unreachable and local extraction unavailable".to_string(),
            ));
        }

        if remote_demoted {
            if local_viable && !local_demoted {
                return Ok(Strategy::Local);
            }
            return Err(RouterError::StrategyUnavailable(
                "remote extraction demoted after repeated failures".to_string(),
            ));
        }

        if !local_viable || local_demoted {
            return Ok(Strategy::Remote);
        }

        let remote_score = self.remote_score(document, remote_quality);
        // Equal scores go remote: richer structured output.
        if remote_score >= self.config.local_baseline_score {
            Ok(Strategy::Remote)
        } else {
            Ok(Strategy::Local)
        }
    }

    fn remote_score(&self, document: &Document, remote_quality: f32) -> f32 {
        let size_factor =
            1.0 - (document.size_bytes() as f32 / self.config.size_reference_bytes as f32).min(1.0);
        let mime_factor = mime_affinity(&document.mime_type);
        self.config.size_weight * size_factor
            + self.config.mime_weight * mime_factor
            + self.config.quality_weight * remote_quality
    }

    /// Run the extraction on the chosen strategy. Does not retry on the
    /// other strategy unless cross-strategy fallback is enabled in config;
    /// with fallback off the caller sees the original error, keeping result
    /// provenance unambiguous.
    pub async fn execute(
        &self,
        document: &Document,
        strategy: Strategy,
    ) -> Result<ExtractionResult, RouterError> {
        match self.run_backend(document, strategy).await {
            Ok(raw) => Ok(self.assemble(strategy, raw)),
            Err(e) if self.config.allow_fallback && self.fallback_viable(strategy.other()) => {
                tracing::warn!(
                    strategy = %strategy,
                    error = %e,
                    "Extraction failed; falling back to {}",
                    strategy.other()
                );
                let raw = self.run_backend(document, strategy.other()).await?;
                Ok(self.assemble(strategy.other(), raw))
            }
            Err(e) => Err(e),
        }
    }

    async fn run_backend(
        &self,
        document: &Document,
        strategy: Strategy,
    ) -> Result<RawExtraction, RouterError> {
        match strategy {
            Strategy::Remote => self.remote.extract(document).await,
            Strategy::Local => match (&self.local, self.config.remote_only) {
                (Some(local), false) => local.extract(document).await,
                _ => Err(RouterError::StrategyUnavailable(
                    "local extraction is disabled".to_string(),
                )),
            },
        }
    }

    fn fallback_viable(&self, strategy: Strategy) -> bool {
        let demoted = self.metrics.lock().unwrap().consecutive_failures(strategy)
            >= self.config.failure_threshold;
        if demoted {
            return false;
        }
        match strategy {
            Strategy::Remote => self.reachability.is_reachable(),
            Strategy::Local => self.local.is_some() && !self.config.remote_only,
        }
    }

    /// Post-process a backend answer: derive entities from raw text when the
    /// backend returned none, and compute the quality score.
    pub(crate) fn assemble(&self, strategy: Strategy, raw: RawExtraction) -> ExtractionResult {
        let entities = raw
            .entities
            .unwrap_or_else(|| entities::parse_biomarkers(&raw.text));
        let quality_score = entities::quality_score(raw.text.len(), entities.len());
        ExtractionResult {
            strategy,
            text: raw.text,
            entities,
            confidence: raw.confidence,
            quality_score,
        }
    }

    /// Record a completed attempt. Appends to the rolling window and updates
    /// the strategy's consecutive-failure counter.
    pub fn record_outcome(&self, metric: ExtractionAttemptMetric) {
        let mut metrics = self.metrics.lock().unwrap();
        let strategy = metric.strategy;
        tracing::debug!(
            strategy = %strategy,
            success = metric.success,
            quality = metric.quality_score,
            "Extraction outcome recorded"
        );
        metrics.record(metric);
        let streak = metrics.consecutive_failures(strategy);
        if streak == self.config.failure_threshold {
            tracing::warn!(
                strategy = %strategy,
                streak,
                "Extraction strategy demoted after consecutive failures"
            );
        }
    }

    /// Current consecutive-failure count for a strategy (observability).
    pub fn consecutive_failures(&self, strategy: Strategy) -> u32 {
        self.metrics.lock().unwrap().consecutive_failures(strategy)
    }
}

/// How well the remote service handles a given document type.
fn mime_affinity(mime_type: &str) -> f32 {
    match mime_type {
        "application/pdf" => 0.9,
        "image/jpeg" | "image/png" => 0.7,
        "image/tiff" | "image/heic" => 0.6,
        _ => 0.4,
    }
}
