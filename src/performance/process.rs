//! Live counters for the current process
//!
//! Only memory and elapsed time are observable from outside a host
//! runtime, so query, hook and cache counters keep their defaults.

use std::time::{Duration, Instant};
use sysinfo::{Pid, System};
use tracing::{debug, warn};

use super::observation::MemoryLimit;
use super::provider::MetricsProvider;

pub struct ProcessProvider {
    system: System,
    pid: Option<Pid>,
    started: Instant,
    current: u64,
    peak: u64,
    limit: MemoryLimit,
}

impl ProcessProvider {
    /// Create a provider for this process.
    ///
    /// Without an explicit limit the total system memory is used.
    pub fn new(limit: Option<MemoryLimit>) -> Self {
        let mut system = System::new();
        system.refresh_memory();

        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("Cannot determine current pid, memory counters disabled: {}", e);
                None
            }
        };

        let limit = limit.unwrap_or_else(|| match system.total_memory() {
            0 => MemoryLimit::Unlimited,
            total => MemoryLimit::Bytes(total),
        });

        let mut provider = Self {
            system,
            pid,
            started: Instant::now(),
            current: 0,
            peak: 0,
            limit,
        };
        provider.refresh();
        provider
    }

    /// Re-read resident memory and update the observed peak
    pub fn refresh(&mut self) {
        let Some(pid) = self.pid else {
            return;
        };

        if self.system.refresh_process(pid) {
            if let Some(process) = self.system.process(pid) {
                self.current = process.memory();
                self.peak = self.peak.max(self.current);
                debug!("Process {} resident memory: {} bytes", pid, self.current);
            }
        }
    }
}

impl MetricsProvider for ProcessProvider {
    fn source(&self) -> String {
        match self.pid {
            Some(pid) => format!("process {}", pid),
            None => "process".to_string(),
        }
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
        Some(self.started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::provider::Collector;

    #[test]
    fn test_process_provider_reads_memory() {
        let mut provider = ProcessProvider::new(Some(MemoryLimit::parse("64G")));
        provider.refresh();

        assert!(provider.peak_memory_usage() >= provider.memory_usage());
        assert_eq!(provider.memory_limit(), MemoryLimit::Bytes(64 * 1024 * 1024 * 1024));
        assert!(provider.source().starts_with("process"));

        let observation = Collector::default().collect(&provider);
        assert_eq!(observation.total_queries, 0);
        assert!(observation.memory.percentage < 100.0);
    }
}
