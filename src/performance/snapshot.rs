//! Recorded host counters
//!
//! A [`HostSnapshot`] is what a host exports when asked to dump its
//! counters at the end of a request. Every field is optional so partial
//! exports still load; absent counters fall back to the provider defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::observation::{HookCounts, MemoryLimit, QueryRecord};
use super::provider::MetricsProvider;
use crate::error::{WorkshopError, WorkshopResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSnapshot {
    pub label: Option<String>,
    pub num_queries: Option<u64>,
    /// Present only when the host ran with verbose query logging
    pub queries: Option<Vec<QueryRecord>>,
    pub memory_usage: Option<u64>,
    pub peak_memory_usage: Option<u64>,
    /// Host shorthand such as `"256M"` or `"-1"`
    pub memory_limit: Option<String>,
    pub elapsed_seconds: Option<f64>,
    pub hooks: Option<HookCounts>,
    pub cache_hits: Option<u64>,
    pub cache_misses: Option<u64>,
}

impl HostSnapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> WorkshopResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&content)?;

        info!("Loaded host snapshot from {}", path.display());
        Ok(snapshot)
    }

    pub fn from_json(content: &str) -> WorkshopResult<Self> {
        let snapshot: Self = serde_json::from_str(content)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> WorkshopResult<()> {
        if let Some(elapsed) = self.elapsed_seconds {
            if Duration::try_from_secs_f64(elapsed).is_err() {
                return Err(WorkshopError::invalid_snapshot(format!(
                    "elapsed_seconds must be a non-negative duration in range, got {}",
                    elapsed
                )));
            }
        }

        if let Some(queries) = &self.queries {
            if let Some(query) = queries
                .iter()
                .find(|q| !q.duration.is_finite() || q.duration < 0.0)
            {
                return Err(WorkshopError::invalid_snapshot(format!(
                    "query '{}' has invalid duration {}",
                    query.sql, query.duration
                )));
            }
        }

        Ok(())
    }
}

impl MetricsProvider for HostSnapshot {
    fn source(&self) -> String {
        self.label.clone().unwrap_or_else(|| "snapshot".to_string())
    }

    fn query_count(&self) -> u64 {
        // Hosts that only export the log still have a count
        self.num_queries
            .or_else(|| self.queries.as_ref().map(|q| q.len() as u64))
            .unwrap_or(0)
    }

    fn query_log(&self) -> Option<Vec<QueryRecord>> {
        self.queries.clone()
    }

    fn memory_usage(&self) -> u64 {
        self.memory_usage.unwrap_or(0)
    }

    fn peak_memory_usage(&self) -> u64 {
        self.peak_memory_usage.or(self.memory_usage).unwrap_or(0)
    }

    fn memory_limit(&self) -> MemoryLimit {
        self.memory_limit
            .as_deref()
            .map(MemoryLimit::parse)
            .unwrap_or(MemoryLimit::Unlimited)
    }

    fn elapsed(&self) -> Option<Duration> {
        self.elapsed_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    fn hook_counts(&self) -> HookCounts {
        self.hooks.unwrap_or_default()
    }

    fn cache_counters(&self) -> Option<(u64, u64)> {
        match (self.cache_hits, self.cache_misses) {
            (None, None) => None,
            (hits, misses) => Some((hits.unwrap_or(0), misses.unwrap_or(0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::provider::Collector;

    #[test]
    fn test_partial_snapshot_loads() {
        let snapshot = HostSnapshot::from_json(r#"{ "num_queries": 12 }"#).unwrap();
        assert_eq!(snapshot.query_count(), 12);
        assert!(snapshot.query_log().is_none());
        assert!(snapshot.cache_counters().is_none());
        assert!(snapshot.memory_limit().is_unlimited());
        assert_eq!(snapshot.source(), "snapshot");
    }

    #[test]
    fn test_full_snapshot_collects() {
        let json = r#"{
            "label": "checkout page",
            "queries": [
                { "sql": "SELECT 1", "duration": 0.2, "caller": "cart" },
                { "sql": "SELECT 1", "duration": 0.01, "caller": "cart" }
            ],
            "memory_usage": 100,
            "peak_memory_usage": 200,
            "memory_limit": "1K",
            "elapsed_seconds": 0.5,
            "hooks": { "total": 42, "hooks": 7 },
            "cache_hits": 3
        }"#;

        let snapshot = HostSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.source(), "checkout page");
        assert_eq!(snapshot.query_count(), 2);
        assert_eq!(snapshot.cache_counters(), Some((3, 0)));

        let observation = Collector::default().collect(&snapshot);
        assert_eq!(observation.slow_queries.len(), 1);
        assert_eq!(observation.duplicate_queries.len(), 1);
        assert_eq!(observation.memory.limit, MemoryLimit::Bytes(1024));
        assert_eq!(observation.hooks.total, 42);
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let err = HostSnapshot::from_json(r#"{ "elapsed_seconds": -1.0 }"#).unwrap_err();
        assert!(matches!(err, WorkshopError::InvalidSnapshot(_)));

        let err = HostSnapshot::from_json("not json").unwrap_err();
        assert!(matches!(err, WorkshopError::Json(_)));
    }

    #[test]
    fn test_out_of_range_elapsed_rejected() {
        let err = HostSnapshot::from_json(r#"{ "elapsed_seconds": 1e20 }"#).unwrap_err();
        assert!(matches!(err, WorkshopError::InvalidSnapshot(_)));

        // Built without validation, the collector still falls back to no baseline
        let snapshot = HostSnapshot {
            elapsed_seconds: Some(1e20),
            ..HostSnapshot::default()
        };
        assert!(snapshot.elapsed().is_none());
        let observation = Collector::default().collect(&snapshot);
        assert_eq!(observation.elapsed_seconds, 0.0);
    }

    #[test]
    fn test_saturated_cache_counters_collect() {
        let snapshot = HostSnapshot::from_json(
            r#"{ "cache_hits": 18446744073709551615, "cache_misses": 1 }"#,
        )
        .unwrap();

        let observation = Collector::default().collect(&snapshot);
        assert_eq!(observation.cache.samples(), u64::MAX);
        assert_eq!(observation.cache.ratio, 100.0);
    }
}
