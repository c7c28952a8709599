//! Credential-pool behavior driven through the full fetch path.

mod helpers;

use ipintel::{Config, Engine, ManualClock};
use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::ipqs_payload;

fn single_key_config(server: &MockServer) -> Config {
    Config {
        provider_base_override: Some(server.uri()),
        ipqs_keys: vec!["K1".into()],
        ..Default::default()
    }
}

/// 429s bench a single-key pool after two strikes; the cooldown restores it.
#[tokio::test]
async fn test_single_key_429_bench_and_cooldown() {
    let server = MockServer::start().await;
    // ipguide offline so only ipqs matters.
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipguide/.+"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipqs/api/json/ip/K1/.+"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too many requests"))
        .expect(2)
        .mount(&server)
        .await;

    let clock = ManualClock::new(1_700_000_000_000);
    let engine = Engine::with_clock(single_key_config(&server), clock.clone()).unwrap();
    let pool = engine.pool("ipqs").unwrap().clone();

    // First 429: one strike, key stays healthy.
    let bundle = engine.check_ip("198.51.100.10", None).await;
    assert!(bundle
        .errors
        .iter()
        .any(|e| e.source == "ipqs" && e.error.contains("All API keys exhausted")));
    assert_eq!(pool.healthy_count(), 1);

    // Second 429 (different IP, so no cache hit): key benched.
    let _ = engine.check_ip("198.51.100.11", None).await;
    assert_eq!(pool.healthy_count(), 0);

    // While benched, further calls never reach the provider (expect(2)
    // above verifies the request count on drop).
    let bundle = engine.check_ip("198.51.100.12", None).await;
    assert!(bundle
        .errors
        .iter()
        .any(|e| e.source == "ipqs" && e.error.contains("exhausted")));

    // After the 5-minute cooldown the key is handed out again.
    clock.advance(5 * 60 * 1_000);
    assert!(pool.get_next().is_some());
    assert_eq!(pool.healthy_count(), 1);
}

/// A three-key pool routes around one stuck key without starving the rest.
#[tokio::test]
async fn test_three_key_pool_routes_around_stuck_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipguide/.+"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    // Key A is rejected outright; B and C work.
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipqs/api/json/ip/A/.+"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipqs/api/json/ip/[BC]/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ipqs_payload("US", "Residential")))
        .mount(&server)
        .await;

    let config = Config {
        provider_base_override: Some(server.uri()),
        ipqs_keys: vec!["A".into(), "B".into(), "C".into()],
        ..Default::default()
    };
    let clock = ManualClock::new(1_700_000_000_000);
    let engine = Engine::with_clock(config, clock).unwrap();
    let pool = engine.pool("ipqs").unwrap().clone();

    // The rotation visits A on the first and third calls; its second 401
    // benches it. Every call still succeeds by failing over.
    for ip in ["198.51.100.20", "198.51.100.21", "198.51.100.22"] {
        let bundle = engine.check_ip(ip, None).await;
        assert!(bundle.successful.iter().any(|s| s.source == "ipqs"));
    }
    assert_eq!(pool.healthy_count(), 2);

    // With A benched, the rotation only hands out B and C, evenly.
    let mut counts = std::collections::HashMap::new();
    for _ in 0..1_000 {
        let lease = pool.get_next().expect("healthy keys remain");
        *counts.entry(lease.key).or_insert(0usize) += 1;
    }
    assert_eq!(counts.get("A"), None);
    assert!((490..=510).contains(counts.get("B").unwrap()));
    assert!((490..=510).contains(counts.get("C").unwrap()));
}

/// Non-key failures (a 404, say) do not burn through the rotation.
#[tokio::test]
async fn test_non_key_error_stops_rotation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipguide/.+"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipqs/api/json/ip/.+"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such endpoint"))
        .expect(1)
        .mount(&server)
        .await;

    let config = Config {
        provider_base_override: Some(server.uri()),
        ipqs_keys: vec!["A".into(), "B".into(), "C".into()],
        ..Default::default()
    };
    let engine = Engine::new(config).unwrap();
    let bundle = engine.check_ip("198.51.100.30", None).await;

    // One attempt only; the error is propagated as-is, keys stay healthy.
    let pool = engine.pool("ipqs").unwrap();
    assert_eq!(pool.healthy_count(), 3);
    assert!(bundle
        .errors
        .iter()
        .any(|e| e.source == "ipqs" && e.error.contains("404")));
}
