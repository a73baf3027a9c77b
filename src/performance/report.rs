//! Report assembly and rendering
//!
//! Maps an observation and its advisories to the sections shown in the
//! diagnostics panel: statistics, slow queries, duplicates, and
//! recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

use super::advisor::{Advisor, Advisory, AdvisoryPriority};
use super::observation::{format_bytes, Observation};
use super::provider::{Collector, MetricsProvider};
use crate::error::WorkshopResult;

/// Longest query text shown in a table row
const MAX_SQL_WIDTH: usize = 72;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub observation: Observation,
    pub advisories: Vec<Advisory>,
}

impl PerformanceReport {
    /// Collect from the provider and evaluate in one step
    pub fn build(collector: &Collector, advisor: &Advisor, provider: &dyn MetricsProvider) -> Self {
        let observation = collector.collect(provider);
        let advisories = advisor.evaluate(&observation);

        Self {
            generated_at: Utc::now(),
            source: provider.source(),
            observation,
            advisories,
        }
    }

    pub fn problems(&self) -> impl Iterator<Item = &Advisory> {
        self.advisories.iter().filter(|a| a.is_problem())
    }

    /// Highest priority among the advisories
    pub fn worst_priority(&self) -> AdvisoryPriority {
        self.advisories
            .iter()
            .map(|a| a.priority)
            .max()
            .unwrap_or(AdvisoryPriority::Info)
    }

    pub fn to_json(&self) -> WorkshopResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_table(&self) -> String {
        let obs = &self.observation;
        let mut out = String::new();

        let _ = writeln!(out, "Performance Report: {}", self.source);
        let _ = writeln!(out, "Generated: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        out.push('\n');

        section(&mut out, "Performance Statistics");
        let limit = obs.memory.limit.to_string();
        let stats = [
            ("Total queries", obs.total_queries.to_string()),
            ("Slow queries", obs.slow_queries.len().to_string()),
            ("Duplicate queries", obs.duplicate_queries.len().to_string()),
            ("Memory (current)", format_bytes(obs.memory.current)),
            ("Memory (peak)", format_bytes(obs.memory.peak)),
            ("Memory limit", limit),
            ("Memory usage", format!("{:.2}%", obs.memory.percentage)),
            ("Execution time", format!("{:.3}s", obs.elapsed_seconds)),
            ("Registered callbacks", format!("{} on {} hooks", obs.hooks.total, obs.hooks.hooks)),
            ("Cache hits", obs.cache.hits.to_string()),
            ("Cache misses", obs.cache.misses.to_string()),
            ("Cache hit ratio", format!("{}%", obs.cache.ratio)),
        ];
        for (name, value) in stats {
            let _ = writeln!(out, "  {:<24} {}", name, value);
        }

        if !obs.slow_queries.is_empty() {
            out.push('\n');
            section(&mut out, "Slow Queries");
            let _ = writeln!(out, "  {:<10} {:<24} {}", "Time", "Caller", "Query");
            for query in &obs.slow_queries {
                let _ = writeln!(
                    out,
                    "  {:<10} {:<24} {}",
                    format!("{:.4}s", query.duration),
                    query.caller,
                    truncate(&query.sql, MAX_SQL_WIDTH)
                );
            }
        }

        if !obs.duplicate_queries.is_empty() {
            out.push('\n');
            section(&mut out, "Duplicate Queries");
            let _ = writeln!(out, "  {:<10} {}", "Count", "Query");
            for dup in &obs.duplicate_queries {
                let _ = writeln!(out, "  {:<10} {}", dup.count, truncate(&dup.query, MAX_SQL_WIDTH));
            }
        }

        out.push('\n');
        section(&mut out, "Recommendations");
        let _ = writeln!(out, "  {:<10} {:<9} {}", "Priority", "Type", "Message");
        for advisory in &self.advisories {
            let _ = writeln!(
                out,
                "  {:<10} {:<9} {}",
                advisory.priority.to_string(),
                advisory.kind.to_string(),
                advisory.message
            );
        }

        out
    }
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.len()));
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
