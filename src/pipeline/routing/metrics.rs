//! Rolling extraction metrics.
//!
//! A bounded append-only window of attempt records plus two independent
//! consecutive-failure counters, one per strategy. The window feeds the
//! rolling quality average used in strategy scoring; the counters drive
//! temporary demotion.

use std::collections::VecDeque;

use super::types::{ExtractionAttemptMetric, Strategy};

#[derive(Debug)]
pub struct StrategyMetrics {
    window: VecDeque<ExtractionAttemptMetric>,
    cap: usize,
    remote_failure_streak: u32,
    local_failure_streak: u32,
}

impl StrategyMetrics {
    pub fn new(cap: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(cap.min(128)),
            cap,
            remote_failure_streak: 0,
            local_failure_streak: 0,
        }
    }

    /// Append an attempt record, dropping the oldest past the cap, and
    /// update the strategy's consecutive-failure counter.
    pub fn record(&mut self, metric: ExtractionAttemptMetric) {
        let streak = match metric.strategy {
            Strategy::Remote => &mut self.remote_failure_streak,
            Strategy::Local => &mut self.local_failure_streak,
        };
        if metric.success {
            *streak = 0;
        } else {
            *streak += 1;
        }

        if self.window.len() == self.cap {
            self.window.pop_front();
        }
        self.window.push_back(metric);
    }

    /// Mean quality score of this strategy's attempts in the window.
    /// `None` when the strategy has no history yet.
    pub fn rolling_quality(&self, strategy: Strategy) -> Option<f32> {
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for m in self.window.iter().filter(|m| m.strategy == strategy) {
            sum += m.quality_score;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(sum / count as f32)
        }
    }

    pub fn consecutive_failures(&self, strategy: Strategy) -> u32 {
        match strategy {
            Strategy::Remote => self.remote_failure_streak,
            Strategy::Local => self.local_failure_streak,
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
