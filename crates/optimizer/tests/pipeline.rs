mod common;

use common::StubLambda;
use config::RunConfig;
use optimizer::Driver;
use serde_json::json;
use std::sync::Arc;

fn run_config(value: serde_json::Value) -> RunConfig {
    RunConfig::from_value(value).expect("test run configuration is valid")
}

/// Duration surface with an interior cost optimum: m * d(m) is minimized
/// around 2040 MB.
fn interior_surface(memory_mb: u32, _payload: &str, _index: u32) -> f64 {
    50.0 + 2000.0 * (-f64::from(memory_mb) / 400.0).exp()
}

#[tokio::test(start_paused = true)]
async fn recommends_the_interior_optimum() {
    let client = Arc::new(StubLambda::new(512, interior_surface));
    let config = run_config(json!({
        "function_name": "resize-images",
        "vendor": "AWS",
        "region": "us-west-2",
        "payload": {"width": 128}
    }));

    let report = Driver::new(client.clone(), &config, false)
        .run()
        .await
        .expect("run succeeds");

    assert!(
        (1900..=2200).contains(&report.memory_mb),
        "recommended {} MB",
        report.memory_mb
    );
    assert!(report.exploration_cost_usd > 0.0);
    assert_eq!(report.per_payload.len(), 1);
    let recommendation = &report.per_payload[0].recommendation;
    assert!(recommendation.expected_cost_usd > 0.0);
    assert!(recommendation.expected_duration_ms > 0.0);

    // Pre-run configuration is restored when not applying.
    assert_eq!(client.memory_mb(), 512);
    assert_eq!(client.timeout_s(), 60);
}

#[tokio::test(start_paused = true)]
async fn applies_the_recommendation_when_asked() {
    let client = Arc::new(StubLambda::new(512, interior_surface));
    let config = run_config(json!({
        "function_name": "resize-images",
        "vendor": "AWS",
        "region": "us-west-2",
        "payload": {}
    }));

    let report = Driver::new(client.clone(), &config, true)
        .run()
        .await
        .expect("run succeeds");

    assert_eq!(client.memory_mb(), report.memory_mb);
    // The function's own timeout comes back even when the memory does not.
    assert_eq!(client.timeout_s(), 60);
}

#[tokio::test(start_paused = true)]
async fn out_of_memory_floor_is_raised_and_skipped() {
    // Flat 100 ms durations make the cost strictly increasing in memory,
    // so the recommendation lands on the lowest surviving configuration.
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0).oom_below(256));
    let config = run_config(json!({
        "function_name": "resize-images",
        "vendor": "AWS",
        "region": "us-west-2",
        "payload": {}
    }));

    let report = Driver::new(client.clone(), &config, false)
        .run()
        .await
        .expect("run succeeds despite the out-of-memory floor");

    assert_eq!(report.memory_mb, 256);
    // The failed probes at 128 MB were billed and must be accounted.
    assert!(report.exploration_cost_usd > 0.0);
    assert_eq!(client.memory_mb(), 512);
}

#[tokio::test(start_paused = true)]
async fn memory_bounds_restrict_the_recommendation() {
    let client = Arc::new(StubLambda::new(512, interior_surface));
    let config = run_config(json!({
        "function_name": "resize-images",
        "vendor": "AWS",
        "region": "us-west-2",
        "payload": {},
        "memory_bounds": [128, 1024]
    }));

    let report = Driver::new(client.clone(), &config, false)
        .run()
        .await
        .expect("run succeeds");

    // The optimum sits past the ceiling, so the ceiling wins.
    assert!(
        report.memory_mb <= 1024,
        "recommended {} MB",
        report.memory_mb
    );
}

#[tokio::test(start_paused = true)]
async fn weighted_payload_mix_aggregates_per_payload_optima() {
    // The dominant payload is flat (cheapest at the floor); the rare one
    // wants a large configuration.
    let client = Arc::new(StubLambda::new(512, |memory_mb, payload, index| {
        if payload.contains("flat") {
            100.0
        } else {
            interior_surface(memory_mb, payload, index)
        }
    }));
    let config = run_config(json!({
        "function_name": "resize-images",
        "vendor": "AWS",
        "region": "us-west-2",
        "payloads": [
            {"payload": {"mode": "flat"}, "weight": 0.9},
            {"payload": {"mode": "heavy"}, "weight": 0.1}
        ]
    }));

    let report = Driver::new(client.clone(), &config, false)
        .run()
        .await
        .expect("run succeeds");

    assert_eq!(report.per_payload.len(), 2);
    assert_eq!(report.per_payload[0].recommendation.memory_mb, 128);
    assert!(
        report.per_payload[1].recommendation.memory_mb > 1500,
        "heavy payload recommended {} MB",
        report.per_payload[1].recommendation.memory_mb
    );
    // The 0.9-weight flat payload dominates the aggregate.
    assert_eq!(report.memory_mb, 128);
}
