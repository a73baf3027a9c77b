//! Host counter access and observation collection
//!
//! Hosts expose their counters through [`MetricsProvider`]. Every accessor
//! has a default meaning "the host does not offer this", so a provider only
//! overrides what it actually knows. The [`Collector`] turns whatever is
//! available into an [`Observation`] and never fails.

use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::observation::{
    CacheStats, DuplicateQuery, HookCounts, MemoryLimit, MemorySnapshot, Observation,
    QueryRecord, SlowQuery,
};
use super::thresholds::AdvisorThresholds;

/// Read-only access to a host's performance counters
pub trait MetricsProvider {
    /// Short label for the host, used in reports
    fn source(&self) -> String {
        "host".to_string()
    }

    /// Total queries executed in this request
    fn query_count(&self) -> u64 {
        0
    }

    /// Executed queries; `None` when verbose query logging is off
    fn query_log(&self) -> Option<Vec<QueryRecord>> {
        None
    }

    fn memory_usage(&self) -> u64 {
        0
    }

    fn peak_memory_usage(&self) -> u64 {
        0
    }

    fn memory_limit(&self) -> MemoryLimit {
        MemoryLimit::Unlimited
    }

    /// Time since the host's start baseline, if one was recorded
    fn elapsed(&self) -> Option<Duration> {
        None
    }

    fn hook_counts(&self) -> HookCounts {
        HookCounts::default()
    }

    /// Cache `(hits, misses)` when the caching layer exposes them
    fn cache_counters(&self) -> Option<(u64, u64)> {
        None
    }
}

/// Builds observations from a provider
#[derive(Debug, Clone, Default)]
pub struct Collector {
    thresholds: AdvisorThresholds,
}

impl Collector {
    pub fn new(thresholds: AdvisorThresholds) -> Self {
        Self { thresholds }
    }

    /// Snapshot every counter the provider offers
    pub fn collect(&self, provider: &dyn MetricsProvider) -> Observation {
        let log = provider.query_log().unwrap_or_default();

        let observation = Observation {
            total_queries: provider.query_count(),
            slow_queries: self.slow_queries(&log),
            duplicate_queries: Self::duplicate_queries(&log),
            memory: MemorySnapshot::new(
                provider.memory_usage(),
                provider.peak_memory_usage(),
                provider.memory_limit(),
            ),
            elapsed_seconds: provider.elapsed().map(|d| d.as_secs_f64()).unwrap_or(0.0),
            hooks: provider.hook_counts(),
            cache: provider
                .cache_counters()
                .map(|(hits, misses)| CacheStats::new(hits, misses))
                .unwrap_or_default(),
            collected_at: Utc::now(),
        };

        debug!(
            "Collected observation from {}: {} queries, {} logged, {:.2}% memory",
            provider.source(),
            observation.total_queries,
            log.len(),
            observation.memory.percentage
        );

        observation
    }

    /// Queries slower than the threshold, in log order
    fn slow_queries(&self, log: &[QueryRecord]) -> Vec<SlowQuery> {
        log.iter()
            .filter(|query| query.duration > self.thresholds.slow_query_seconds)
            .map(|query| SlowQuery {
                sql: query.sql.clone(),
                duration: query.duration,
                caller: query.caller.clone(),
            })
            .collect()
    }

    /// Query texts seen more than once, in order of first appearance
    fn duplicate_queries(log: &[QueryRecord]) -> Vec<DuplicateQuery> {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, u64> = HashMap::new();

        for query in log {
            let count = counts.entry(query.sql.as_str()).or_insert_with(|| {
                order.push(query.sql.as_str());
                0
            });
            *count += 1;
        }

        order
            .into_iter()
            .filter_map(|sql| match counts[sql] {
                count if count > 1 => Some(DuplicateQuery {
                    query: sql.to_string(),
                    count,
                }),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyHost;

    impl MetricsProvider for EmptyHost {}

    struct LoggingHost {
        log: Vec<QueryRecord>,
    }

    impl MetricsProvider for LoggingHost {
        fn query_count(&self) -> u64 {
            self.log.len() as u64
        }

        fn query_log(&self) -> Option<Vec<QueryRecord>> {
            Some(self.log.clone())
        }

        fn cache_counters(&self) -> Option<(u64, u64)> {
            Some((40, 70))
        }

        fn elapsed(&self) -> Option<Duration> {
            Some(Duration::from_millis(1500))
        }
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let observation = Collector::default().collect(&EmptyHost);
        assert_eq!(observation.total_queries, 0);
        assert!(observation.slow_queries.is_empty());
        assert!(observation.duplicate_queries.is_empty());
        assert_eq!(observation.memory.percentage, 0.0);
        assert!(observation.memory.limit.is_unlimited());
        assert_eq!(observation.elapsed_seconds, 0.0);
        assert_eq!(observation.cache.ratio, 0.0);
        assert_eq!(observation.hooks.total, 0);
    }

    #[test]
    fn test_slow_and_duplicate_queries() {
        let host = LoggingHost {
            log: vec![
                QueryRecord::new("SELECT * FROM meta WHERE id = 1", 0.01, "loop"),
                QueryRecord::new("SELECT * FROM meta WHERE id = 1", 0.06, "loop"),
                QueryRecord::new("SELECT COUNT(*) FROM posts", 0.05, "count"),
                QueryRecord::new("SELECT * FROM meta WHERE id = 2", 0.2, "loop"),
                QueryRecord::new("SELECT COUNT(*) FROM posts", 0.01, "count"),
                QueryRecord::new("SELECT * FROM meta WHERE id = 1", 0.01, "loop"),
            ],
        };

        let observation = Collector::default().collect(&host);
        assert_eq!(observation.total_queries, 6);

        // 0.05 is not strictly above the cutoff
        assert_eq!(observation.slow_queries.len(), 2);
        assert_eq!(observation.slow_queries[0].duration, 0.06);
        assert_eq!(observation.slow_queries[1].sql, "SELECT * FROM meta WHERE id = 2");

        assert_eq!(
            observation.duplicate_queries,
            vec![
                DuplicateQuery {
                    query: "SELECT * FROM meta WHERE id = 1".to_string(),
                    count: 3
                },
                DuplicateQuery {
                    query: "SELECT COUNT(*) FROM posts".to_string(),
                    count: 2
                },
            ]
        );

        assert_eq!(observation.cache.ratio, 36.36);
        assert_eq!(observation.elapsed_seconds, 1.5);
    }
}
