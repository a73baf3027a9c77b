//! Observation data model
//!
//! An [`Observation`] is one snapshot of the counters a host runtime keeps
//! for a single request. It is built by the collector, handed to the
//! advisor and then dropped; nothing here is cached across requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;

/// One executed query as recorded by the host's verbose query log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub sql: String,
    /// Execution time in seconds
    pub duration: f64,
    pub caller: String,
}

impl QueryRecord {
    pub fn new<S: Into<String>, C: Into<String>>(sql: S, duration: f64, caller: C) -> Self {
        Self {
            sql: sql.into(),
            duration,
            caller: caller.into(),
        }
    }
}

/// Query whose duration exceeded the slow-query threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowQuery {
    pub sql: String,
    pub duration: f64,
    pub caller: String,
}

/// Query text that ran more than once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateQuery {
    pub query: String,
    pub count: u64,
}

/// Configured memory ceiling of the host process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MemoryLimit {
    Bytes(u64),
    Unlimited,
}

impl MemoryLimit {
    /// Parse the host's shorthand notation (`"-1"`, `"256M"`, `"1G"`, `"512k"`, `"1048576"`).
    ///
    /// Leading digits are taken and scaled by the unit letter, if any.
    /// Anything that does not yield a positive byte count is unlimited.
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        if value == "-1" {
            return MemoryLimit::Unlimited;
        }

        let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
        let base = match digits.parse::<u64>() {
            Ok(n) => n,
            Err(_) => return MemoryLimit::Unlimited,
        };

        let multiplier = if value.contains('g') {
            GB
        } else if value.contains('m') {
            MB
        } else if value.contains('k') {
            KB
        } else {
            1
        };

        match base.saturating_mul(multiplier) {
            0 => MemoryLimit::Unlimited,
            bytes => MemoryLimit::Bytes(bytes),
        }
    }

    pub fn bytes(&self) -> Option<u64> {
        match self {
            MemoryLimit::Bytes(bytes) => Some(*bytes),
            MemoryLimit::Unlimited => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, MemoryLimit::Unlimited)
    }
}

impl Default for MemoryLimit {
    fn default() -> Self {
        MemoryLimit::Unlimited
    }
}

impl From<String> for MemoryLimit {
    fn from(value: String) -> Self {
        MemoryLimit::parse(&value)
    }
}

impl From<MemoryLimit> for String {
    fn from(limit: MemoryLimit) -> Self {
        match limit {
            MemoryLimit::Bytes(bytes) => bytes.to_string(),
            MemoryLimit::Unlimited => "-1".to_string(),
        }
    }
}

impl fmt::Display for MemoryLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryLimit::Bytes(bytes) => write!(f, "{}", format_bytes(*bytes)),
            MemoryLimit::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Process memory counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub current: u64,
    pub peak: u64,
    pub limit: MemoryLimit,
    /// Higher of peak and current usage as a share of the limit; 0 when unlimited
    pub percentage: f64,
}

impl MemorySnapshot {
    pub fn new(current: u64, peak: u64, limit: MemoryLimit) -> Self {
        // Peak can never sit below current usage
        let high_water = peak.max(current);
        let percentage = match limit {
            MemoryLimit::Bytes(limit_bytes) if limit_bytes > 0 => {
                (high_water as f64 / limit_bytes as f64) * 100.0
            }
            _ => 0.0,
        };

        Self {
            current,
            peak,
            limit,
            percentage,
        }
    }
}

impl Default for MemorySnapshot {
    fn default() -> Self {
        Self::new(0, 0, MemoryLimit::Unlimited)
    }
}

/// Registered callback totals across all extension points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookCounts {
    pub total: u64,
    /// Extension points that carry at least one callback
    pub hooks: u64,
}

/// Object cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Hit ratio in percent, two decimals; 0 without samples
    pub ratio: f64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64) -> Self {
        let samples = hits as f64 + misses as f64;
        let ratio = if samples > 0.0 {
            round2((hits as f64 / samples) * 100.0)
        } else {
            0.0
        };

        Self { hits, misses, ratio }
    }

    pub fn samples(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }
}

/// One snapshot of host performance counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub total_queries: u64,
    pub slow_queries: Vec<SlowQuery>,
    pub duplicate_queries: Vec<DuplicateQuery>,
    pub memory: MemorySnapshot,
    /// Seconds since the host's start baseline; 0 without one
    pub elapsed_seconds: f64,
    pub hooks: HookCounts,
    pub cache: CacheStats,
    pub collected_at: DateTime<Utc>,
}

impl Default for Observation {
    fn default() -> Self {
        Self {
            total_queries: 0,
            slow_queries: Vec::new(),
            duplicate_queries: Vec::new(),
            memory: MemorySnapshot::default(),
            elapsed_seconds: 0.0,
            hooks: HookCounts::default(),
            cache: CacheStats::default(),
            collected_at: Utc::now(),
        }
    }
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Human readable byte size
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
