mod common;

use common::StubLambda;
use config::DynamicSamplingParams;
use optimizer::exploration::aws::{
    AwsConfigManager, AwsCostCalculator, AwsInvoker, AwsLogParser,
};
use optimizer::exploration::{ConfigManager, Explorer, Invoker};
use optimizer::{Error, MemorySpace, Sampler};
use std::sync::Arc;

fn explorer(client: &Arc<StubLambda>, bounds: Option<[u32; 2]>) -> Explorer {
    let client: Arc<StubLambda> = Arc::clone(client);
    let mut explorer = Explorer::new(
        Box::new(AwsConfigManager::new(client.clone(), "fn")),
        Box::new(AwsInvoker::new(client.clone(), "fn", 3)),
        Box::new(AwsLogParser),
        Box::new(AwsCostCalculator::new(client, "fn", "us-west-2")),
        MemorySpace::aws_default(bounds),
    );
    explorer.set_payload("{}".to_string());
    explorer
}

#[tokio::test(start_paused = true)]
async fn invoker_retries_through_throttling() {
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0).throttles(2));
    let invoker = AwsInvoker::new(client.clone(), "fn", 5);

    let log = invoker.invoke("{}").await.expect("retries succeed");
    assert!(String::from_utf8_lossy(&log).contains("Billed Duration"));
    assert_eq!(client.invocations(), 1);
}

#[tokio::test(start_paused = true)]
async fn invoker_gives_up_after_its_attempt_budget() {
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0).read_timeouts(10));
    let invoker = AwsInvoker::new(client.clone(), "fn", 3);

    let err = invoker.invoke("{}").await.unwrap_err();
    assert!(matches!(err, Error::MaxAttemptsReached { attempts: 3, .. }));
    assert_eq!(client.invocations(), 0);
}

#[tokio::test(start_paused = true)]
async fn config_manager_retries_conflicts_and_snapshots_once() {
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0).conflicts(2));
    let manager = AwsConfigManager::new(client.clone(), "fn");

    manager.set_config(1024, None).await.expect("update lands");
    assert_eq!(client.memory_mb(), 1024);

    let initial = manager.initial_config().expect("snapshot taken");
    assert_eq!(initial.memory_mb, 512);
    assert_eq!(initial.timeout_s, 60);

    // A later update must not move the snapshot.
    manager.set_config(2048, None).await.expect("update lands");
    assert_eq!(manager.initial_config().unwrap().memory_mb, 512);

    manager.reset_config().await.expect("restore lands");
    assert_eq!(client.memory_mb(), 512);
    assert_eq!(client.timeout_s(), 60);

    // Restoring twice is a no-op.
    manager.reset_config().await.expect("second reset is fine");
    assert_eq!(client.memory_mb(), 512);
}

#[tokio::test(start_paused = true)]
async fn config_manager_surfaces_persistent_conflicts() {
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0).conflicts(50));
    let manager = AwsConfigManager::new(client.clone(), "fn");

    let err = manager.set_config(1024, None).await.unwrap_err();
    assert!(matches!(err, Error::ConfigConflict { .. }));
    assert_eq!(client.memory_mb(), 512);
}

#[tokio::test(start_paused = true)]
async fn failed_invocations_are_still_charged() {
    // Every configuration is below the out-of-memory floor.
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0).oom_below(4096));
    let mut explorer = explorer(&client, None);

    let err = explorer
        .explore_parallel(3, 3, Some(512))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FunctionOutOfMemory { .. }));
    assert!(explorer.cost() > 0.0, "billed failures must be priced");
}

#[tokio::test(start_paused = true)]
async fn dynamic_sampling_settles_noisy_configurations() {
    // Durations alternate between 100 and 130 ms, keeping the coefficient
    // of variation above the threshold.
    let client = Arc::new(StubLambda::new(512, |_, _, index| {
        if index % 2 == 0 { 130.0 } else { 100.0 }
    }));
    let mut sampler = Sampler::new(explorer(&client, None), 3, DynamicSamplingParams::default());

    sampler.update_sample(512).await.expect("sampling succeeds");

    let sample = sampler.sample();
    assert!(sample.len() >= 3, "keeps at least the initial batch");
    assert!(sample.len() <= 8, "respects the per-config cap");
    // 3 parallel plus at most 8 dynamic re-invocations.
    assert!(client.invocations() <= 11);
    assert!(sample.memories().iter().all(|&m| m == 512));
}

#[tokio::test(start_paused = true)]
async fn quiet_configurations_need_no_extra_invocations() {
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0));
    let mut sampler = Sampler::new(explorer(&client, None), 3, DynamicSamplingParams::default());

    sampler.update_sample(512).await.expect("sampling succeeds");

    assert_eq!(sampler.sample().len(), 3);
    assert_eq!(client.invocations(), 3);
}

#[tokio::test(start_paused = true)]
async fn initialization_fails_when_the_space_collapses() {
    // Everything under 4 GB is out of memory; the bounded space shrinks
    // below the three probes a fit needs.
    let client = Arc::new(StubLambda::new(512, |_, _, _| 100.0).oom_below(4096));
    let mut sampler = Sampler::new(
        explorer(&client, Some([128, 640])),
        3,
        DynamicSamplingParams::default(),
    );

    let err = sampler.initialize_sample().await.unwrap_err();
    assert!(matches!(err, Error::NoMemoryLeft));
}
