//! Translation run metrics.
//!
//! Counters are owned by the translator for one run and reported in the
//! `translations.json` metadata.

use serde::{Deserialize, Serialize};

/// Counters for a single translation run
#[derive(Debug, Clone, Default)]
pub struct TranslationMetrics {
    /// Texts served from the cache
    cache_hits: usize,

    /// Texts that had to go to the provider
    cache_misses: usize,

    /// Chat completion requests issued, batch or single
    api_calls: usize,

    /// Requests that failed after retries
    api_failures: usize,

    /// Batches that fell back to per-item translation
    batch_fallbacks: usize,

    /// Batch slots with no usable line in the response
    padded_items: usize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn record_cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    pub fn record_api_call(&mut self) {
        self.api_calls += 1;
    }

    pub fn record_api_failure(&mut self) {
        self.api_failures += 1;
    }

    pub fn record_batch_fallback(&mut self) {
        self.batch_fallbacks += 1;
    }

    pub fn record_padded_items(&mut self, count: usize) {
        self.padded_items += count;
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses
    }

    pub fn api_calls(&self) -> usize {
        self.api_calls
    }

    pub fn api_failures(&self) -> usize {
        self.api_failures
    }

    pub fn batch_fallbacks(&self) -> usize {
        self.batch_fallbacks
    }

    pub fn padded_items(&self) -> usize {
        self.padded_items
    }

    /// Snapshot with derived rates
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            cache_hit_rate: percentage(self.cache_hits, self.cache_hits + self.cache_misses),
            api_calls: self.api_calls,
            api_failures: self.api_failures,
            api_success_rate: percentage(
                self.api_calls.saturating_sub(self.api_failures),
                self.api_calls,
            ),
            batch_fallbacks: self.batch_fallbacks,
            padded_items: self.padded_items,
        }
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Metrics report for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,

    /// Cache hit rate as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub api_calls: usize,
    pub api_failures: usize,

    /// API success rate as a percentage (0-100)
    pub api_success_rate: f64,

    pub batch_fallbacks: usize,
    pub padded_items: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let report = TranslationMetrics::new().report();

        assert_eq!(report.cache_hits, 0);
        assert_eq!(report.cache_misses, 0);
        assert_eq!(report.cache_hit_rate, 0.0);
        assert_eq!(report.api_calls, 0);
        assert_eq!(report.api_success_rate, 0.0);
        assert_eq!(report.batch_fallbacks, 0);
        assert_eq!(report.padded_items, 0);
    }

    #[test]
    fn test_report_cache_hit_rate() {
        let mut metrics = TranslationMetrics::new();

        // 3 hits, 1 miss = 75% hit rate
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        let report = metrics.report();
        assert_eq!(report.cache_hits, 3);
        assert_eq!(report.cache_misses, 1);
        assert_eq!(report.cache_hit_rate, 75.0);
    }

    #[test]
    fn test_report_api_success_rate() {
        let mut metrics = TranslationMetrics::new();

        for _ in 0..4 {
            metrics.record_api_call();
        }
        metrics.record_api_failure();

        let report = metrics.report();
        assert_eq!(report.api_calls, 4);
        assert_eq!(report.api_failures, 1);
        assert_eq!(report.api_success_rate, 75.0);
    }

    #[test]
    fn test_report_all_api_failures() {
        let mut metrics = TranslationMetrics::new();
        metrics.record_api_call();
        metrics.record_api_failure();
        metrics.record_api_call();
        metrics.record_api_failure();

        assert_eq!(metrics.report().api_success_rate, 0.0);
    }

    #[test]
    fn test_fallbacks_and_padding() {
        let mut metrics = TranslationMetrics::new();
        metrics.record_batch_fallback();
        metrics.record_padded_items(2);
        metrics.record_padded_items(1);

        assert_eq!(metrics.batch_fallbacks(), 1);
        assert_eq!(metrics.padded_items(), 3);
    }

    #[test]
    fn test_runs_do_not_share_counters() {
        let mut first = TranslationMetrics::new();
        first.record_cache_hit();
        let second = TranslationMetrics::new();

        assert_eq!(first.cache_hits(), 1);
        assert_eq!(second.cache_hits(), 0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let mut metrics = TranslationMetrics::new();
        metrics.record_cache_hit();
        let json = serde_json::to_value(metrics.report()).unwrap();

        assert_eq!(json["cacheHits"], 1);
        assert_eq!(json["cacheHitRate"], 100.0);
        assert!(json.get("batchFallbacks").is_some());
    }
}
