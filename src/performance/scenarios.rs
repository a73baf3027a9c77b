//! Simulated host and anti-pattern scenarios
//!
//! [`SimulatedHost`] keeps the same counters a platform runtime keeps for a
//! request, and the scenarios drive it the way the workshop demos drive a
//! live site: lookups inside loops, unbounded retention, piles of
//! callbacks, a slow request. Time runs on a virtual clock so scenarios are
//! deterministic and never sleep.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use super::observation::{HookCounts, MemoryLimit, QueryRecord};
use super::provider::MetricsProvider;
use crate::error::{WorkshopError, WorkshopResult};

const MIB: u64 = 1024 * 1024;
/// Resident memory of an idle request before any scenario runs
const BASE_MEMORY: u64 = 2 * MIB;
/// Per-item lookups issued by the N+1 loop
pub const LOOKUPS_PER_POST: u64 = 16;
/// Aggregate joins issued after the N+1 loop
const SLOW_JOIN_COUNT: u32 = 5;

/// In-memory host that records counters
#[derive(Debug)]
pub struct SimulatedHost {
    label: String,
    save_queries: bool,
    query_count: u64,
    queries: Vec<QueryRecord>,
    retained: Vec<Vec<u8>>,
    current: u64,
    peak: u64,
    limit: MemoryLimit,
    callbacks: HashMap<String, Vec<Duration>>,
    cache_hits: u64,
    cache_misses: u64,
    clock: Duration,
}

impl SimulatedHost {
    pub fn new(limit: MemoryLimit, save_queries: bool) -> Self {
        Self {
            label: "simulated".to_string(),
            save_queries,
            query_count: 0,
            queries: Vec::new(),
            retained: Vec::new(),
            current: BASE_MEMORY,
            peak: BASE_MEMORY,
            limit,
            callbacks: HashMap::new(),
            cache_hits: 0,
            cache_misses: 0,
            clock: Duration::ZERO,
        }
    }

    pub fn with_label<S: Into<String>>(mut self, label: S) -> Self {
        self.label = label.into();
        self
    }

    /// Record an executed query and charge its duration to the clock.
    ///
    /// Negative or NaN durations count as zero; the clock saturates.
    pub fn record_query<S: Into<String>, C: Into<String>>(&mut self, sql: S, seconds: f64, caller: C) {
        let seconds = seconds.max(0.0);
        let cost = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX);
        self.query_count += 1;
        self.clock = self.clock.saturating_add(cost);
        if self.save_queries {
            self.queries.push(QueryRecord::new(sql, seconds, caller));
        }
    }

    /// Allocate and keep a buffer for the rest of the request
    pub fn retain(&mut self, bytes: usize) {
        self.retained.push(vec![0xA5; bytes]);
        self.current += bytes as u64;
        self.peak = self.peak.max(self.current);
    }

    /// Drop every retained buffer; the peak is kept
    pub fn release_all(&mut self) {
        self.retained.clear();
        self.current = BASE_MEMORY;
    }

    pub fn retained_bytes(&self) -> u64 {
        self.retained.iter().map(|b| b.len() as u64).sum()
    }

    /// Register a callback on an extension point with the time it costs when fired
    pub fn add_callback(&mut self, hook: &str, cost: Duration) {
        self.callbacks.entry(hook.to_string()).or_default().push(cost);
    }

    /// Fire an extension point, running all of its callbacks once
    pub fn fire(&mut self, hook: &str) {
        if let Some(costs) = self.callbacks.get(hook) {
            let total: Duration = costs.iter().sum();
            self.clock = self.clock.saturating_add(total);
        }
    }

    pub fn cache_hit(&mut self) {
        self.cache_hits += 1;
    }

    pub fn cache_miss(&mut self) {
        self.cache_misses += 1;
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.clock = self.clock.saturating_add(elapsed);
    }
}

impl MetricsProvider for SimulatedHost {
    fn source(&self) -> String {
        self.label.clone()
    }

    fn query_count(&self) -> u64 {
        self.query_count
    }

    fn query_log(&self) -> Option<Vec<QueryRecord>> {
        self.save_queries.then(|| self.queries.clone())
    }

    fn memory_usage(&self) -> u64 {
        self.current
    }

    fn peak_memory_usage(&self) -> u64 {
        self.peak
    }

    fn memory_limit(&self) -> MemoryLimit {
        self.limit
    }

    fn elapsed(&self) -> Option<Duration> {
        Some(self.clock)
    }

    fn hook_counts(&self) -> HookCounts {
        HookCounts {
            total: self.callbacks.values().map(|c| c.len() as u64).sum(),
            hooks: self.callbacks.values().filter(|c| !c.is_empty()).count() as u64,
        }
    }

    fn cache_counters(&self) -> Option<(u64, u64)> {
        Some((self.cache_hits, self.cache_misses))
    }
}

/// Scenario tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Items walked by the N+1 loop and rendered by the hook overload
    pub posts: u32,
    pub retain_mb: u64,
    pub memory_limit_mb: u64,
    pub delay_ms: u64,
    /// Verbose query logging on the simulated host
    pub save_queries: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            posts: 50,
            retain_mb: 240,
            memory_limit_mb: 256,
            delay_ms: 2500,
            save_queries: true,
        }
    }
}

impl ScenarioConfig {
    pub fn validate(&self) -> WorkshopResult<()> {
        if self.memory_limit_mb == 0 {
            return Err(WorkshopError::invalid_config("memory_limit_mb cannot be zero"));
        }
        Ok(())
    }

    fn memory_limit(&self) -> MemoryLimit {
        MemoryLimit::Bytes(self.memory_limit_mb * MIB)
    }
}

/// Workshop scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    NPlusOne,
    MemoryRetention,
    HookOverload,
    SlowRequest,
    Baseline,
}

impl Scenario {
    pub fn all() -> &'static [Scenario] {
        &[
            Scenario::NPlusOne,
            Scenario::MemoryRetention,
            Scenario::HookOverload,
            Scenario::SlowRequest,
            Scenario::Baseline,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::NPlusOne => "n-plus-one",
            Scenario::MemoryRetention => "memory-retention",
            Scenario::HookOverload => "hook-overload",
            Scenario::SlowRequest => "slow-request",
            Scenario::Baseline => "baseline",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Scenario::NPlusOne => "Per-item lookups inside a loop plus slow aggregate joins",
            Scenario::MemoryRetention => "Large buffers retained for the whole request",
            Scenario::HookOverload => "Hundreds of slow callbacks on common extension points",
            Scenario::SlowRequest => "Artificial delay in request processing",
            Scenario::Baseline => "A well-behaved request with a warm cache",
        }
    }

    /// Run the scenario against a fresh simulated host
    pub fn run(&self, config: &ScenarioConfig) -> SimulatedHost {
        let mut host = SimulatedHost::new(config.memory_limit(), config.save_queries)
            .with_label(self.name());

        match self {
            Scenario::NPlusOne => n_plus_one(&mut host, config.posts),
            Scenario::MemoryRetention => memory_retention(&mut host, config.retain_mb),
            Scenario::HookOverload => hook_overload(&mut host, config.posts),
            Scenario::SlowRequest => slow_request(&mut host, config.delay_ms),
            Scenario::Baseline => baseline(&mut host),
        }

        host
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scenario {
    type Err = WorkshopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Scenario::all()
            .iter()
            .copied()
            .find(|scenario| scenario.name() == wanted)
            .ok_or_else(|| WorkshopError::unknown_scenario(s))
    }
}

fn n_plus_one(host: &mut SimulatedHost, posts: u32) {
    for id in 1..=u64::from(posts) {
        let author = id % 3 + 1;
        let meta = |key: &str| {
            format!(
                "SELECT meta_value FROM wp_postmeta WHERE post_id = {} AND meta_key = '{}'",
                id, key
            )
        };
        let terms = |taxonomy: &str| {
            format!(
                "SELECT t.* FROM wp_terms t INNER JOIN wp_term_taxonomy tt ON t.term_id = tt.term_id \
                 INNER JOIN wp_term_relationships tr ON tr.term_taxonomy_id = tt.term_taxonomy_id \
                 WHERE tr.object_id = {} AND tt.taxonomy = '{}'",
                id, taxonomy
            )
        };

        let lookups = [
            (format!("SELECT meta_key, meta_value FROM wp_postmeta WHERE post_id = {}", id), "get_post_meta"),
            (meta("_edit_last"), "get_post_meta"),
            (meta("_edit_lock"), "get_post_meta"),
            (meta("_thumbnail_id"), "get_post_meta"),
            (format!("SELECT * FROM wp_users WHERE ID = {}", author), "get_the_author_meta"),
            (format!("SELECT * FROM wp_users WHERE ID = {}", author), "get_the_author_meta"),
            (format!("SELECT * FROM wp_postmeta WHERE post_id = {}", id), "wpdb::get_results"),
            (format!("SELECT COUNT(*) FROM wp_postmeta WHERE post_id = {}", id), "wpdb::get_var"),
            (terms("category"), "wp_get_post_terms"),
            (terms("post_tag"), "wp_get_post_terms"),
            (terms("category"), "wp_get_post_categories"),
            (terms("post_tag"), "wp_get_post_tags"),
            (format!("SELECT comment_approved, COUNT(*) FROM wp_comments WHERE comment_post_ID = {} GROUP BY comment_approved", id), "wp_count_comments"),
            (format!("SELECT * FROM wp_comments WHERE comment_post_ID = {} LIMIT 1", id), "get_comments"),
            (meta("_thumbnail_id"), "get_post_thumbnail_id"),
            (meta("_thumbnail_id"), "has_post_thumbnail"),
        ];

        for (i, (sql, caller)) in lookups.into_iter().enumerate() {
            host.cache_miss();
            host.record_query(sql, 0.0005 + (i % 4) as f64 * 0.0005, caller);
        }
    }

    host.record_query(
        "SELECT p.*, pm.* FROM wp_posts p LEFT JOIN wp_postmeta pm ON p.ID = pm.post_id \
         WHERE p.post_status = 'publish' ORDER BY p.post_date DESC LIMIT 500",
        0.03,
        "wpdb::get_results",
    );

    for _ in 0..SLOW_JOIN_COUNT {
        host.record_query(
            "SELECT p.ID, p.post_title, COUNT(DISTINCT pm.meta_id) AS meta_count, \
             COUNT(DISTINCT c.comment_ID) AS comment_count FROM wp_posts p \
             LEFT JOIN wp_postmeta pm ON p.ID = pm.post_id \
             LEFT JOIN wp_comments c ON p.ID = c.comment_post_ID \
             GROUP BY p.ID HAVING meta_count > 0 ORDER BY meta_count DESC LIMIT 20",
            0.08,
            "wpdb::get_results",
        );
    }

    info!(
        "N+1 scenario complete: {} posts processed, {} queries issued",
        posts, host.query_count
    );
}

fn memory_retention(host: &mut SimulatedHost, retain_mb: u64) {
    for _ in 0..retain_mb {
        host.retain(MIB as usize);
    }

    // Unbounded object cache: every entry is written, nothing is read back
    for _ in 0..1000 {
        host.cache_miss();
    }

    info!(
        "Memory retention scenario complete: retained {} MB",
        host.retained_bytes() / MIB
    );
}

fn hook_overload(host: &mut SimulatedHost, posts: u32) {
    let ms = Duration::from_millis;

    for i in 0..50 {
        host.add_callback("the_content", ms(5));
        host.add_callback("the_title", if i % 5 == 0 { ms(3) } else { Duration::ZERO });
    }

    for j in 0..30 {
        host.add_callback("wp_head", ms(8));
        host.add_callback("wp_footer", ms(10));
        host.add_callback("wp_enqueue_scripts", if j % 3 == 0 { ms(15) } else { Duration::ZERO });
    }

    host.add_callback("wp_footer", ms(50));

    // One page render: head, one title and content filter pass per post, footer
    host.fire("wp_enqueue_scripts");
    host.fire("wp_head");
    for _ in 0..posts {
        host.fire("the_title");
        host.fire("the_content");
    }
    host.fire("wp_footer");

    info!(
        "Hook overload scenario complete: {} callbacks registered",
        host.hook_counts().total
    );
}

fn slow_request(host: &mut SimulatedHost, delay_ms: u64) {
    host.record_query("SELECT option_value FROM wp_options WHERE autoload = 'yes'", 0.002, "wp_load_alloptions");
    host.advance(Duration::from_millis(delay_ms));

    info!("Slow request scenario complete: {} ms delay", delay_ms);
}

fn baseline(host: &mut SimulatedHost) {
    host.record_query("SELECT option_value FROM wp_options WHERE autoload = 'yes'", 0.002, "wp_load_alloptions");
    host.record_query("SELECT * FROM wp_posts WHERE post_status = 'publish' LIMIT 10", 0.004, "WP_Query::get_posts");
    host.record_query("SELECT post_id, meta_key, meta_value FROM wp_postmeta WHERE post_id IN (1,2,3,4,5,6,7,8,9,10)", 0.003, "update_meta_cache");
    host.record_query("SELECT t.*, tr.object_id FROM wp_terms t INNER JOIN wp_term_relationships tr ON tr.term_taxonomy_id = t.term_id WHERE tr.object_id IN (1,2,3,4,5,6,7,8,9,10)", 0.003, "update_object_term_cache");
    host.record_query("SELECT * FROM wp_users WHERE ID IN (1,2,3)", 0.001, "cache_users");

    for _ in 0..200 {
        host.cache_hit();
    }
    for _ in 0..20 {
        host.cache_miss();
    }

    host.retain(MIB as usize);
    host.advance(Duration::from_millis(120));
}
