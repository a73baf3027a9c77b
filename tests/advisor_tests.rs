use workshop_perf::performance::{
    Advisor, AdvisoryKind, AdvisoryPriority, CacheStats, MemoryLimit, MemorySnapshot,
    Observation, SlowQuery,
};

const MB: u64 = 1_000_000;

fn slow_queries(durations: &[f64]) -> Vec<SlowQuery> {
    durations
        .iter()
        .enumerate()
        .map(|(i, &duration)| SlowQuery {
            sql: format!("SELECT * FROM wp_postmeta WHERE post_id = {}", i),
            duration,
            caller: "render_loop".to_string(),
        })
        .collect()
}

#[test]
fn test_nominal_observations_yield_single_success() {
    let nominal = [
        (0, 0.0, CacheStats::new(0, 0), 0.0),
        (50, 80.0, CacheStats::new(60, 40), 2.0),
        (10, 10.0, CacheStats::new(1, 99), 1.0), // ratio 1% but only 100 samples
        (49, 79.9, CacheStats::new(500, 500), 1.99),
    ];

    for (queries, memory_pct, cache, elapsed) in nominal {
        let mut observation = Observation::default();
        observation.total_queries = queries;
        observation.memory = MemorySnapshot::new(0, (memory_pct * 10.0) as u64, MemoryLimit::Bytes(1000));
        observation.cache = cache;
        observation.elapsed_seconds = elapsed;

        let advisories = Advisor::default().evaluate(&observation);
        assert_eq!(advisories.len(), 1, "unexpected advisories for {:?}", observation);
        assert_eq!(advisories[0].kind, AdvisoryKind::Success);
        assert_eq!(advisories[0].priority, AdvisoryPriority::Info);
    }
}

#[test]
fn test_high_query_count() {
    let mut observation = Observation::default();
    observation.total_queries = 75;

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::Warning);
    assert_eq!(advisories[0].priority, AdvisoryPriority::High);
    assert!(advisories[0].message.contains("75"));
}

#[test]
fn test_slow_queries() {
    let mut observation = Observation::default();
    observation.slow_queries = slow_queries(&[0.06, 0.1, 0.2]);

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::Error);
    assert_eq!(advisories[0].priority, AdvisoryPriority::Critical);
    assert!(advisories[0].message.contains('3'));
}

#[test]
fn test_high_memory_usage() {
    let mut observation = Observation::default();
    observation.memory = MemorySnapshot::new(900 * MB, 900 * MB, MemoryLimit::Bytes(1000 * MB));

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::Warning);
    assert_eq!(advisories[0].priority, AdvisoryPriority::High);
    assert!(advisories[0].message.contains("90"));
}

#[test]
fn test_high_memory_usage_without_peak() {
    let mut observation = Observation::default();
    observation.memory = MemorySnapshot::new(900 * MB, 0, MemoryLimit::Bytes(1000 * MB));

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::Warning);
    assert_eq!(advisories[0].priority, AdvisoryPriority::High);
    assert!(advisories[0].message.contains("90"));
}

#[test]
fn test_unlimited_memory_never_fires() {
    let mut observation = Observation::default();
    observation.memory = MemorySnapshot::new(900 * MB, 900 * MB, MemoryLimit::parse("-1"));
    assert_eq!(observation.memory.percentage, 0.0);

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories[0].kind, AdvisoryKind::Success);
}

#[test]
fn test_low_cache_ratio() {
    let mut observation = Observation::default();
    observation.cache = CacheStats::new(40, 70);

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::Info);
    assert_eq!(advisories[0].priority, AdvisoryPriority::Medium);
    assert!(advisories[0].message.contains("36.36"));
}

#[test]
fn test_cold_cache_below_sample_threshold() {
    let mut observation = Observation::default();
    observation.cache = CacheStats::new(5, 5);
    assert_eq!(observation.cache.ratio, 50.0);

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].kind, AdvisoryKind::Success);

    // A completely cold cache has no samples and a zero ratio
    observation.cache = CacheStats::new(0, 0);
    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories[0].kind, AdvisoryKind::Success);
}

#[test]
fn test_all_rules_fire_in_declaration_order() {
    let mut observation = Observation::default();
    observation.total_queries = 120;
    observation.slow_queries = slow_queries(&[0.3]);
    observation.memory = MemorySnapshot::new(950 * MB, 950 * MB, MemoryLimit::Bytes(1000 * MB));
    observation.cache = CacheStats::new(10, 200);
    observation.elapsed_seconds = 3.5;

    let advisories = Advisor::default().evaluate(&observation);
    let shape: Vec<_> = advisories.iter().map(|a| (a.kind, a.priority)).collect();
    assert_eq!(
        shape,
        vec![
            (AdvisoryKind::Warning, AdvisoryPriority::High),
            (AdvisoryKind::Error, AdvisoryPriority::Critical),
            (AdvisoryKind::Warning, AdvisoryPriority::High),
            (AdvisoryKind::Info, AdvisoryPriority::Medium),
            (AdvisoryKind::Error, AdvisoryPriority::Critical),
        ]
    );

    assert!(advisories[0].message.contains("120"));
    assert!(advisories[1].message.starts_with("1 slow queries"));
    assert!(advisories[2].message.contains("95%"));
    assert!(advisories[3].message.contains("4.76%"));
    assert!(advisories[4].message.contains("3.5 seconds"));
    assert!(advisories.iter().all(|a| a.is_problem()));
}

#[test]
fn test_order_is_not_priority_order() {
    let mut observation = Observation::default();
    observation.total_queries = 51;
    observation.elapsed_seconds = 2.5;

    let advisories = Advisor::default().evaluate(&observation);
    assert_eq!(advisories.len(), 2);
    // High-priority query warning precedes the critical timing error
    assert_eq!(advisories[0].priority, AdvisoryPriority::High);
    assert_eq!(advisories[1].priority, AdvisoryPriority::Critical);
}
