//! End-to-end aggregation against a mocked provider universe.

mod helpers;

use ipintel::derive::{build_record, IpType};
use ipintel::{Clock, Config, Engine, ManualClock};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use helpers::*;

#[tokio::test]
async fn test_all_providers_succeed_on_8888() {
    let server = MockServer::start().await;
    mount_happy_universe(&server, "8.8.8.8").await;

    let engine = Engine::new(full_config(&server)).unwrap();
    let bundle = engine.check_ip("8.8.8.8", None).await;

    assert_eq!(bundle.ip, "8.8.8.8");
    assert_eq!(bundle.asn.as_deref(), Some("15169"));
    assert!(bundle.errors.is_empty(), "errors: {:?}", bundle.errors);
    assert_eq!(bundle.total_api_count, 6);

    let record = build_record(&bundle, None, 0);

    // Every hosting-class vote agrees.
    assert_eq!(record.summary.ip_type.value, IpType::Datacenter);
    assert!(record.summary.risk.is_hosting);

    // Registry and geo country agree.
    assert_eq!(record.summary.ip_source.is_native, Some(true));
    assert_eq!(record.summary.ip_source.geo_country.as_deref(), Some("US"));
    assert_eq!(
        record.summary.ip_source.registry_country.as_deref(),
        Some("US")
    );

    for source in [
        "ipguide",
        "ipinfo",
        "ipqs",
        "abuseipdb",
        "ip2location",
        "cloudflare_asn",
    ] {
        assert!(
            record.meta.sources.contains(&source.to_string()),
            "missing source {source}: {:?}",
            record.meta.sources
        );
    }

    // I1: the record carries the exact input IP.
    assert_eq!(record.ip, "8.8.8.8");
    // I6: counts match the attempt partition.
    assert_eq!(
        record.meta.total_api_count,
        record.meta.sources.len() + record.meta.api_errors.len()
    );
}

#[tokio::test]
async fn test_wave2_runs_only_with_asn_and_enabled_provider() {
    let server = MockServer::start().await;

    // ipguide responds without any ASN data: wave 1 yields no ASN.
    Mock::given(method("GET"))
        .and(path("/ipguide/198.51.100.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "198.51.100.1",
            "location": {"city": "Nowhere"}
        })))
        .mount(&server)
        .await;

    let config = Config {
        provider_base_override: Some(server.uri()),
        cloudflare_tokens: vec!["cf-token".into()],
        ..Default::default()
    };
    let engine = Engine::new(config).unwrap();
    let bundle = engine.check_ip("198.51.100.1", None).await;

    assert_eq!(bundle.asn, None);
    // No ASN means the ASN-dependent provider is never attempted.
    assert!(bundle.successful.iter().all(|s| s.source != "cloudflare_asn"));
    assert!(bundle.errors.iter().all(|e| e.source != "cloudflare_asn"));
    assert_eq!(bundle.total_api_count, 1);
}

#[tokio::test]
async fn test_asn_hint_triggers_wave2_without_discovery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipguide/198.51.100.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "198.51.100.2",
            "location": {"city": "Nowhere"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloudflare_asn/client/v4/radar/entities/asns/64500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cloudflare_payload(64500, "DE")))
        .mount(&server)
        .await;

    let config = Config {
        provider_base_override: Some(server.uri()),
        cloudflare_tokens: vec!["cf-token".into()],
        ..Default::default()
    };
    let engine = Engine::new(config).unwrap();
    let bundle = engine.check_ip("198.51.100.2", Some("64500".into())).await;

    assert_eq!(bundle.asn.as_deref(), Some("64500"));
    assert!(bundle.successful.iter().any(|s| s.source == "cloudflare_asn"));
}

#[tokio::test]
async fn test_cached_result_is_byte_identical_within_ttl() {
    let server = MockServer::start().await;
    mount_happy_universe(&server, "8.8.8.8").await;

    let clock = ManualClock::new(1_700_000_000_000);
    let engine = Engine::with_clock(full_config(&server), clock.clone()).unwrap();

    let first = engine.check_ip("8.8.8.8", None).await;
    let requests_after_first = server.received_requests().await.unwrap().len();

    clock.advance(60_000);
    let second = engine.check_ip("8.8.8.8", None).await;

    // No additional outbound traffic, and the merged payload is identical.
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_first
    );
    assert!(second.partially_from_cache);
    assert_eq!(second.cached_api_count, second.total_api_count);
    assert_eq!(
        serde_json::to_vec(&first.merged).unwrap(),
        serde_json::to_vec(&second.merged).unwrap()
    );
}

#[tokio::test]
async fn test_negative_cache_suppresses_refetch_for_a_minute() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ipguide/203.0.113.5"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let clock = ManualClock::new(1_700_000_000_000);
    let engine = Engine::with_clock(nokey_config(&server), clock.clone()).unwrap();

    let first = engine.check_ip("203.0.113.5", None).await;
    assert!(first.successful.is_empty());
    assert_eq!(first.errors.len(), 1);
    let requests_after_first = server.received_requests().await.unwrap().len();
    assert_eq!(requests_after_first, 1);

    // Within the negative TTL: no new outbound request.
    clock.advance(30_000);
    let second = engine.check_ip("203.0.113.5", None).await;
    assert!(second.partially_from_cache);
    assert!(second.successful.is_empty());
    assert!(!second.errors.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let record = build_record(&second, None, clock.now_millis());
    assert!(record.meta.sources.is_empty());
    assert!(!record.meta.api_errors.is_empty());

    // Past the negative TTL the fetch happens again.
    clock.advance(31_000);
    let _third = engine.check_ip("203.0.113.5", None).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_partial_failure_still_merges_the_rest() {
    let server = MockServer::start().await;
    // Happy responses everywhere except abuseipdb, which hard-fails.
    Mock::given(method("GET"))
        .and(path("/ipguide/8.8.4.4"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ipguide_payload("8.8.4.4", 15169, "US")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipinfo/8.8.4.4/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ipinfo_payload("8.8.4.4", "US", true)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path_regex(r"^/ipqs/api/json/ip/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ipqs_payload("US", "Data Center")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ip2location/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(ip2location_payload("8.8.4.4", "US", "DCH")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloudflare_asn/client/v4/radar/entities/asns/15169"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cloudflare_payload(15169, "US")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/abuseipdb/api/v2/check"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let mut config = full_config(&server);
    config.abuseipdb_keys = vec!["only-key".into()];
    let engine = Engine::new(config).unwrap();
    let bundle = engine.check_ip("8.8.4.4", None).await;

    let record = build_record(&bundle, None, 0);
    // I2: successes and failures partition the attempted set.
    assert!(record.meta.sources.iter().all(|s| s != "abuseipdb"));
    assert!(record
        .meta
        .api_errors
        .iter()
        .any(|e| e.source == "abuseipdb" && e.error.contains("exhausted")));
    assert_eq!(
        record.meta.total_api_count,
        record.meta.sources.len() + record.meta.api_errors.len()
    );
    // The rest still produced a usable record.
    assert_eq!(record.summary.ip_type.value, IpType::Datacenter);
}
