//! Extraction routing: remote vs. on-device strategy selection, execution
//! with optional cross-strategy fallback, and rolling outcome metrics.

pub mod entities;
pub mod error;
pub mod metrics;
pub mod router;
pub mod types;

pub use entities::{parse_biomarkers, quality_score};
pub use error::RouterError;
pub use metrics::StrategyMetrics;
pub use router::{ExtractionRouter, LocalExtractionEngine, RemoteExtraction};
pub use types::{
    Biomarker, ExtractionAttemptMetric, ExtractionResult, RawExtraction, RouterConfig, Strategy,
};
