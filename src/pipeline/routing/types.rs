//! Core types for extraction strategy routing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════
// Strategy
// ═══════════════════════════════════════════

/// The extraction backend chosen for a document: the remote OCR/analysis
/// service, or the on-device engine. "Hybrid" and "automatic" modes from
/// earlier designs are router policies, not extra variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Remote,
    Local,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }

    pub fn other(&self) -> Self {
        match self {
            Self::Remote => Self::Local,
            Self::Local => Self::Remote,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ═══════════════════════════════════════════
// Extraction output
// ═══════════════════════════════════════════

/// A structured lab value pulled out of report text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Biomarker {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub reference_low: Option<f64>,
    pub reference_high: Option<f64>,
    /// Set when a reference range is known: value falls outside it.
    pub out_of_range: Option<bool>,
}

/// What a backend returns before the router post-processes it.
/// Remote backends usually include structured entities; the local engine
/// returns raw text and the router derives entities itself.
#[derive(Debug, Clone)]
pub struct RawExtraction {
    pub text: String,
    pub entities: Option<Vec<Biomarker>>,
    pub confidence: f32,
}

/// Final extraction output handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub strategy: Strategy,
    pub text: String,
    pub entities: Vec<Biomarker>,
    pub confidence: f32,
    /// Derived from text length and entity count; feeds strategy selection.
    pub quality_score: f32,
}

// ═══════════════════════════════════════════
// Attempt metrics
// ═══════════════════════════════════════════

/// Immutable record of one completed extraction attempt. Appended to a
/// bounded rolling window; never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionAttemptMetric {
    pub strategy: Strategy,
    pub document_bytes: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub quality_score: f32,
    pub text_length: usize,
    pub entity_count: usize,
    pub recorded_at: DateTime<Utc>,
}

impl ExtractionAttemptMetric {
    pub fn success(
        strategy: Strategy,
        document_bytes: u64,
        duration_ms: u64,
        result: &ExtractionResult,
    ) -> Self {
        Self {
            strategy,
            document_bytes,
            duration_ms,
            success: true,
            quality_score: result.quality_score,
            text_length: result.text.len(),
            entity_count: result.entities.len(),
            recorded_at: Utc::now(),
        }
    }

    pub fn failure(strategy: Strategy, document_bytes: u64, duration_ms: u64) -> Self {
        Self {
            strategy,
            document_bytes,
            duration_ms,
            success: false,
            quality_score: 0.0,
            text_length: 0,
            entity_count: 0,
            recorded_at: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════

/// Router configuration with production defaults.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// When set, `select_strategy` only ever answers `Remote` and local
    /// execution is never attempted; absence of a viable remote strategy is
    /// a hard error rather than a silent downgrade.
    pub remote_only: bool,
    /// Retry the other strategy when the chosen one fails. Off by default:
    /// results keep a single, auditable provenance unless product opts in.
    pub allow_fallback: bool,
    /// Consecutive failures before a strategy is temporarily demoted.
    pub failure_threshold: u32,
    /// Rolling metric window size.
    pub metrics_window: usize,
    /// Remote quality assumed when no history exists yet.
    pub default_remote_quality: f32,
    /// Fixed score the local engine competes with.
    pub local_baseline_score: f32,
    /// Weight of the size factor in the remote score.
    pub size_weight: f32,
    /// Weight of the MIME affinity in the remote score.
    pub mime_weight: f32,
    /// Weight of rolling remote quality in the remote score.
    pub quality_weight: f32,
    /// Document size at which the size factor bottoms out.
    pub size_reference_bytes: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            remote_only: false,
            allow_fallback: false,
            failure_threshold: 3,
            metrics_window: 100,
            default_remote_quality: 0.5,
            local_baseline_score: 0.5,
            size_weight: 0.3,
            mime_weight: 0.3,
            quality_weight: 0.4,
            size_reference_bytes: 10 * 1024 * 1024,
        }
    }
}

impl RouterConfig {
    /// Remote-only preset used when the on-device engine is not shipped.
    pub fn remote_only() -> Self {
        Self {
            remote_only: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_other_flips() {
        assert_eq!(Strategy::Remote.other(), Strategy::Local);
        assert_eq!(Strategy::Local.other(), Strategy::Remote);
    }

    #[test]
    fn strategy_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Strategy::Remote).unwrap(), "\"remote\"");
        assert_eq!(serde_json::to_string(&Strategy::Local).unwrap(), "\"local\"");
    }

    #[test]
    fn biomarker_parses_camel_case_wire_shape() {
        let json = r#"{
            "name": "Hemoglobin",
            "value": 13.5,
            "unit": "g/dL",
            "referenceLow": 12.0,
            "referenceHigh": 15.5,
            "outOfRange": false
        }"#;
        let b: Biomarker = serde_json::from_str(json).unwrap();
        assert_eq!(b.name, "Hemoglobin");
        assert_eq!(b.reference_high, Some(15.5));
        assert_eq!(b.out_of_range, Some(false));
    }

    #[test]
    fn failure_metric_has_zero_quality() {
        let m = ExtractionAttemptMetric::failure(Strategy::Remote, 1024, 250);
        assert!(!m.success);
        assert_eq!(m.quality_score, 0.0);
        assert_eq!(m.entity_count, 0);
    }

    #[test]
    fn default_weights_sum_to_one() {
        let c = RouterConfig::default();
        assert!((c.size_weight + c.mime_weight + c.quality_weight - 1.0).abs() < 1e-6);
    }

    #[test]
    fn remote_only_preset_sets_the_flag() {
        assert!(RouterConfig::remote_only().remote_only);
        assert!(!RouterConfig::remote_only().allow_fallback);
    }
}
