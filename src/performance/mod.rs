//! Performance diagnostics
//!
//! This module turns host counters into recommendations:
//! - Host counter access through the `MetricsProvider` trait
//! - Observation collection with derived memory and cache figures
//! - Threshold-based advisories in rule order
//! - Text and JSON reports
//! - Snapshot, live-process and simulated hosts

pub mod advisor;
pub mod observation;
pub mod process;
pub mod provider;
pub mod report;
pub mod scenarios;
pub mod snapshot;
pub mod thresholds;

// Re-export main types for easy access
pub use advisor::{Advisor, Advisory, AdvisoryKind, AdvisoryPriority};
pub use observation::{
    CacheStats, DuplicateQuery, HookCounts, MemoryLimit, MemorySnapshot, Observation,
    QueryRecord, SlowQuery,
};
pub use process::ProcessProvider;
pub use provider::{Collector, MetricsProvider};
pub use report::PerformanceReport;
pub use scenarios::{Scenario, ScenarioConfig, SimulatedHost};
pub use snapshot::HostSnapshot;
pub use thresholds::AdvisorThresholds;

use tracing::info;

/// Collector and advisor sharing one set of thresholds
#[derive(Debug, Clone, Default)]
pub struct PerformanceSystem {
    collector: Collector,
    advisor: Advisor,
}

impl PerformanceSystem {
    pub fn new(thresholds: AdvisorThresholds) -> Self {
        Self {
            collector: Collector::new(thresholds.clone()),
            advisor: Advisor::new(thresholds),
        }
    }

    pub fn thresholds(&self) -> &AdvisorThresholds {
        self.advisor.thresholds()
    }

    /// Evaluate a ready-made observation
    pub fn evaluate(&self, observation: &Observation) -> Vec<Advisory> {
        self.advisor.evaluate(observation)
    }

    /// Collect from a host and produce a full report
    pub fn report(&self, provider: &dyn MetricsProvider) -> PerformanceReport {
        let report = PerformanceReport::build(&self.collector, &self.advisor, provider);
        info!(
            "Report for {}: {} advisories, worst priority {}",
            report.source,
            report.advisories.len(),
            report.worst_priority()
        );
        report
    }
}
