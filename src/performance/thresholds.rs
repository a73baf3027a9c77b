//! Threshold constants used by the collector and advisor

use serde::{Deserialize, Serialize};

use crate::error::{WorkshopError, WorkshopResult};

/// More queries than this in one request is flagged
pub const HIGH_QUERY_COUNT: u64 = 50;
/// A query running longer than this (seconds) is slow
pub const SLOW_QUERY_SECONDS: f64 = 0.05;
/// Peak memory above this share of the limit is flagged
pub const HIGH_MEMORY_PERCENT: f64 = 80.0;
/// Cache hit ratio below this is flagged once enough samples exist
pub const LOW_CACHE_RATIO_PERCENT: f64 = 50.0;
/// Cache lookups required before the hit ratio is trusted
pub const MIN_CACHE_SAMPLES: u64 = 100;
/// Requests taking longer than this (seconds) are flagged
pub const SLOW_REQUEST_SECONDS: f64 = 2.0;

/// Advisor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorThresholds {
    pub high_query_count: u64,
    pub slow_query_seconds: f64,
    pub high_memory_percent: f64,
    pub low_cache_ratio_percent: f64,
    pub min_cache_samples: u64,
    pub slow_request_seconds: f64,
}

impl Default for AdvisorThresholds {
    fn default() -> Self {
        Self {
            high_query_count: HIGH_QUERY_COUNT,
            slow_query_seconds: SLOW_QUERY_SECONDS,
            high_memory_percent: HIGH_MEMORY_PERCENT,
            low_cache_ratio_percent: LOW_CACHE_RATIO_PERCENT,
            min_cache_samples: MIN_CACHE_SAMPLES,
            slow_request_seconds: SLOW_REQUEST_SECONDS,
        }
    }
}

impl AdvisorThresholds {
    pub fn validate(&self) -> WorkshopResult<()> {
        let durations = [
            ("slow_query_seconds", self.slow_query_seconds),
            ("slow_request_seconds", self.slow_request_seconds),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(WorkshopError::invalid_config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let percentages = [
            ("high_memory_percent", self.high_memory_percent),
            ("low_cache_ratio_percent", self.low_cache_ratio_percent),
        ];
        for (name, value) in percentages {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(WorkshopError::invalid_config(format!(
                    "{} must be between 0 and 100, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}
