mod utils;
#[allow(unused)]
use utils::*;

use buddyload::core::RunStatistics;
use buddyload::prelude::*;
use mock_service::MockConfig;
use sciencebuddy::driver::{CHAT_CHECK, SUMMARY_CHECK};
use std::time::Duration;

async fn short_run(driver: sciencebuddy::ScienceBuddy, vus: usize) -> RunStatistics {
    driver
        .with_pauses(SHORT_PAUSE, SHORT_PAUSE)
        .scenario()
        .vus(NonZeroUsize::new(vus).unwrap())
        .duration(Duration::from_secs(2))
        .ramp_up(Duration::from_millis(500))
        .graceful_stop(Duration::from_secs(1))
        .await
}

#[tokio::test]
async fn healthy_service_passes_every_check() {
    init();
    let (service, driver) = mock_target(MockConfig::default()).await;

    let stats = short_run(driver, 2).await;

    assert_eq!(stats.config.name, "sciencebuddy");
    assert_eq!(stats.vus_max, 2);
    assert!(stats.iterations >= 4, "iterations={}", stats.iterations);
    assert_eq!(stats.http_req_failed, 0);
    assert_eq!(stats.check_fails(), 0);

    let chat = stats.check(CHAT_CHECK).unwrap();
    let summary = stats.check(SUMMARY_CHECK).unwrap();
    assert!(chat.passes >= stats.iterations);
    assert!(summary.passes >= stats.iterations);

    let chats = service.chat_requests().len() as u64;
    let summaries = service.summary_requests().len() as u64;
    assert_eq!(chats, chat.total());
    assert_eq!(summaries, summary.total());
    assert_eq!(stats.http_reqs, chats + summaries);
}

#[tokio::test]
async fn every_summary_carries_the_vu_session() {
    init();
    let (service, driver) = mock_target(MockConfig::default()).await;

    let stats = short_run(driver, 2).await;
    assert_eq!(stats.check_fails(), 0);

    let summaries = service.summary_requests();
    assert!(!summaries.is_empty());
    assert!(summaries.iter().all(|request| request.session().is_some()));

    let mut sessions: Vec<_> = summaries
        .iter()
        .filter_map(|request| request.session().map(str::to_owned))
        .collect();
    sessions.sort();
    sessions.dedup();
    assert_eq!(sessions.len(), 2, "one session per VU, got {sessions:?}");
}

#[tokio::test]
async fn failing_statuses_fail_the_checks() {
    init();
    let (_service, driver) = mock_target(MockConfig {
        chat_status: 404,
        summary_status: Some(500),
        ..MockConfig::default()
    })
    .await;

    let stats = short_run(driver, 2).await;

    let chat = stats.check(CHAT_CHECK).unwrap();
    let summary = stats.check(SUMMARY_CHECK).unwrap();
    assert_eq!(chat.passes, 0);
    assert_eq!(summary.passes, 0);
    assert!(chat.fails > 0);
    assert!(summary.fails > 0);
    assert_eq!(stats.check_pass_rate(), 0.0);

    // A response arrived every time, so no request counts as failed.
    assert_eq!(stats.http_req_failed, 0);
}

#[tokio::test]
async fn summary_without_session_still_passes() {
    init();
    let (service, driver) = mock_target(MockConfig {
        chat_status: 500,
        ..MockConfig::default()
    })
    .await;

    let stats = short_run(driver, 1).await;

    assert_eq!(stats.check(CHAT_CHECK).unwrap().passes, 0);
    assert_eq!(stats.check(SUMMARY_CHECK).unwrap().fails, 0);
    assert!(service
        .summary_requests()
        .iter()
        .all(|request| request.session().is_none()));
}

#[tokio::test]
async fn unreachable_service_counts_failed_requests() {
    init();
    let target = sciencebuddy::TargetConfig::new("http://127.0.0.1:9").unwrap();
    let stats = short_run(sciencebuddy::ScienceBuddy::new(&target), 1).await;

    assert!(stats.http_reqs > 0);
    assert_eq!(stats.http_req_failed, stats.http_reqs);
    assert_eq!(stats.check_passes(), 0);
}

#[tokio::test]
async fn slow_iterations_are_interrupted_after_graceful_stop() {
    init();
    let (_service, driver) = mock_target(MockConfig::default()).await;

    let started = std::time::Instant::now();
    let stats = driver
        .with_pauses(Pause::none(), Pause::fixed(Duration::from_secs(10)))
        .scenario()
        .vus(NonZeroUsize::new(2).unwrap())
        .duration(Duration::from_secs(1))
        .ramp_up(Duration::ZERO)
        .graceful_stop(Duration::from_millis(500))
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(stats.interrupted_iterations, 2);
    assert_eq!(stats.iterations, 0);
}

#[tokio::test]
async fn summary_export_is_json() {
    init();
    let (_service, driver) = mock_target(MockConfig::default()).await;
    let stats = short_run(driver, 1).await;

    let path = std::env::temp_dir().join(format!("buddyload-summary-{}.json", std::process::id()));
    buddyload::report::export(&stats, &path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(json["config"]["name"], "sciencebuddy");
    assert_eq!(json["iterations"], stats.iterations);
}
