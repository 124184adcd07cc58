use std::sync::atomic::AtomicBool;

use bytescribe_core::{Config, ConfigParams, DriverProtocol, FakeDriver, FuzzerEngine};

fn config_with(agent: &std::path::Path, mutate_count: usize, max_iterations: u64) -> Config {
    Config::build(ConfigParams {
        agent_path: agent.to_path_buf(),
        mutate_count,
        max_iterations,
        seed_count: 20,
        rng_seed: 99,
        ..Default::default()
    })
    .expect("valid config")
}

#[test]
fn zero_seed_count_still_seeds_the_fixed_boundary_set() {
    // `generate_seeds` always includes the fixed boundary set regardless of
    // the requested count, so the corpus is never actually empty after
    // `initialize` in practice.
    let dir = tempfile::tempdir().unwrap();
    let agent = dir.path().join("agent.jar");
    std::fs::write(&agent, b"stub").unwrap();

    let config = Config::build(ConfigParams {
        agent_path: agent.clone(),
        seed_count: 0,
        mutate_count: 1,
        max_iterations: 1,
        ..Default::default()
    })
    .unwrap();

    let driver = FakeDriver::new(|_: &[i64]| (Some(vec![1]), None));
    let mut engine = FuzzerEngine::new(config, driver);
    let cancel = AtomicBool::new(false);
    let summary = engine.run(&cancel);
    assert_eq!(summary.iterations, 1);
    assert!(summary.corpus_size > 0);
}

#[test]
fn novel_coverage_grows_the_corpus_across_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let agent = dir.path().join("agent.jar");
    std::fs::write(&agent, b"stub").unwrap();
    let config = config_with(&agent, 2, 5);

    let counter = std::sync::atomic::AtomicI64::new(0);
    let driver = FakeDriver::new(move |_: &[i64]| {
        let edge = counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        (Some(vec![edge]), None)
    });

    let mut engine = FuzzerEngine::new(config, driver);
    let cancel = AtomicBool::new(false);
    let before = engine.corpus_size();
    let summary = engine.run(&cancel);
    assert!(summary.corpus_size > before);
    assert!(summary.covered_edges > 0);
}

#[test]
fn timeout_produces_no_crash_record() {
    let dir = tempfile::tempdir().unwrap();
    let agent = dir.path().join("agent.jar");
    std::fs::write(&agent, b"stub").unwrap();
    let config = config_with(&agent, 1, 3);

    let driver = FakeDriver::new(|_: &[i64]| (None, Some("timeout after 1s".to_string())));
    let mut engine = FuzzerEngine::new(config, driver);
    let cancel = AtomicBool::new(false);
    let summary = engine.run(&cancel);
    assert_eq!(summary.crash_count, 0);
}

#[test]
fn driver_protocol_round_trips_through_json_strings() {
    let driver = FakeDriver::new(|_: &[i64]| (Some(vec![0, 12, 17]), None));
    let mut protocol = DriverProtocol::new(driver, "pkg.C.m:(I)I");
    let response = protocol.handle_request(r#"{"run_id":"r1","method":"pkg.C.m:(I)I","inputs":[3]}"#);

    assert!(response.contains("\"run_id\":\"r1\""));
    assert!(response.contains("\"status\":\"ok\""));
    assert!(response.contains("\"trace\":[0,12,17]"));
}
