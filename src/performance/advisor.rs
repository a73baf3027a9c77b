//! Threshold-based recommendations
//!
//! The advisor evaluates an [`Observation`] against a fixed rule set. Every
//! rule that applies fires, and advisories come out in the order the rules
//! are declared below, not sorted by priority.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::observation::{round2, Observation};
use super::thresholds::AdvisorThresholds;

/// Advisory category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryKind {
    Warning,
    Error,
    Info,
    Success,
}

impl fmt::Display for AdvisoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisoryKind::Warning => write!(f, "warning"),
            AdvisoryKind::Error => write!(f, "error"),
            AdvisoryKind::Info => write!(f, "info"),
            AdvisoryKind::Success => write!(f, "success"),
        }
    }
}

/// Advisory priority, lowest first so that `Ord` ranks critical highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryPriority {
    Info,
    Medium,
    High,
    Critical,
}

impl fmt::Display for AdvisoryPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvisoryPriority::Info => write!(f, "info"),
            AdvisoryPriority::Medium => write!(f, "medium"),
            AdvisoryPriority::High => write!(f, "high"),
            AdvisoryPriority::Critical => write!(f, "critical"),
        }
    }
}

/// One recommendation derived from an observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
    pub priority: AdvisoryPriority,
}

impl Advisory {
    pub fn new<S: Into<String>>(kind: AdvisoryKind, priority: AdvisoryPriority, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            priority,
        }
    }

    /// Anything other than the all-clear
    pub fn is_problem(&self) -> bool {
        self.kind != AdvisoryKind::Success
    }
}

/// Rule engine turning observations into advisories
#[derive(Debug, Clone, Default)]
pub struct Advisor {
    thresholds: AdvisorThresholds,
}

impl Advisor {
    pub fn new(thresholds: AdvisorThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AdvisorThresholds {
        &self.thresholds
    }

    /// Evaluate all rules; never returns an empty list
    pub fn evaluate(&self, observation: &Observation) -> Vec<Advisory> {
        let t = &self.thresholds;
        let mut advisories = Vec::new();

        if observation.total_queries > t.high_query_count {
            debug!("Query count rule fired: {}", observation.total_queries);
            advisories.push(Advisory::new(
                AdvisoryKind::Warning,
                AdvisoryPriority::High,
                format!(
                    "High number of database queries detected: {}. Consider implementing caching.",
                    observation.total_queries
                ),
            ));
        }

        if !observation.slow_queries.is_empty() {
            debug!("Slow query rule fired: {}", observation.slow_queries.len());
            advisories.push(Advisory::new(
                AdvisoryKind::Error,
                AdvisoryPriority::Critical,
                format!(
                    "{} slow queries detected (>{}ms). Review and optimize these queries.",
                    observation.slow_queries.len(),
                    round2(t.slow_query_seconds * 1000.0)
                ),
            ));
        }

        if observation.memory.percentage > t.high_memory_percent {
            debug!("Memory rule fired: {:.2}%", observation.memory.percentage);
            advisories.push(Advisory::new(
                AdvisoryKind::Warning,
                AdvisoryPriority::High,
                format!(
                    "High memory usage: {}%. Consider increasing memory limit or optimizing code.",
                    round2(observation.memory.percentage)
                ),
            ));
        }

        // Cold caches are ignored until enough lookups have been sampled
        let cache = &observation.cache;
        if cache.samples() > t.min_cache_samples && cache.ratio < t.low_cache_ratio_percent {
            debug!("Cache ratio rule fired: {}% over {} samples", cache.ratio, cache.samples());
            advisories.push(Advisory::new(
                AdvisoryKind::Info,
                AdvisoryPriority::Medium,
                format!(
                    "Low cache hit ratio: {}%. Consider implementing object caching.",
                    cache.ratio
                ),
            ));
        }

        if observation.elapsed_seconds > t.slow_request_seconds {
            debug!("Elapsed time rule fired: {:.2}s", observation.elapsed_seconds);
            advisories.push(Advisory::new(
                AdvisoryKind::Error,
                AdvisoryPriority::Critical,
                format!(
                    "Page generation took {} seconds. Target should be under 1 second.",
                    round2(observation.elapsed_seconds)
                ),
            ));
        }

        if advisories.is_empty() {
            advisories.push(Advisory::new(
                AdvisoryKind::Success,
                AdvisoryPriority::Info,
                "No major performance issues detected. Great job!",
            ));
        }

        advisories
    }
}
