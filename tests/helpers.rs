// Shared test helpers: a wiremock-backed provider universe and canned
// provider payloads for 8.8.8.8.

use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ipintel::config::Config;

/// Config pointing every provider at `server`, with one key per provider.
#[allow(dead_code)] // Used by other test files
pub fn full_config(server: &MockServer) -> Config {
    Config {
        provider_base_override: Some(server.uri()),
        ipqs_keys: vec!["ipqs-key".into()],
        abuseipdb_keys: vec!["abuse-key".into()],
        ip2location_keys: vec!["ip2l-key".into()],
        ipinfo_tokens: vec!["ipinfo-token".into()],
        cloudflare_tokens: vec!["cf-token".into()],
        ..Default::default()
    }
}

/// Config pointing only the no-key provider at `server`.
#[allow(dead_code)]
pub fn nokey_config(server: &MockServer) -> Config {
    Config {
        provider_base_override: Some(server.uri()),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn ipguide_payload(ip: &str, asn: u64, registry_country: &str) -> Value {
    json!({
        "ip": ip,
        "network": {
            "cidr": "8.8.8.0/24",
            "autonomous_system": {
                "asn": asn,
                "name": "GOOGLE",
                "organization": "Google LLC",
                "country": registry_country,
                "rir": "ARIN"
            }
        },
        "location": {
            "city": "Mountain View",
            "country": "United States",
            "timezone": "America/Los_Angeles",
            "latitude": 37.4056,
            "longitude": -122.0775
        }
    })
}

#[allow(dead_code)]
pub fn ipinfo_payload(ip: &str, country: &str, hosting: bool) -> Value {
    json!({
        "ip": ip,
        "hostname": "dns.google",
        "city": "Mountain View",
        "region": "California",
        "country": country,
        "loc": "37.4056,-122.0775",
        "org": "AS15169 Google LLC",
        "postal": "94043",
        "timezone": "America/Los_Angeles",
        "privacy": {"vpn": false, "proxy": false, "tor": false, "relay": false, "hosting": hosting}
    })
}

#[allow(dead_code)]
pub fn ipqs_payload(country: &str, connection_type: &str) -> Value {
    json!({
        "success": true,
        "fraud_score": 0,
        "country_code": country,
        "region": "California",
        "city": "Mountain View",
        "ISP": "Google",
        "ASN": 15169,
        "organization": "Google",
        "timezone": "America/Los_Angeles",
        "latitude": 37.39,
        "longitude": -122.07,
        "mobile": false,
        "proxy": false,
        "vpn": false,
        "tor": false,
        "active_vpn": false,
        "active_tor": false,
        "recent_abuse": false,
        "bot_status": false,
        "connection_type": connection_type
    })
}

#[allow(dead_code)]
pub fn abuseipdb_payload(ip: &str, country: &str, usage_type: &str) -> Value {
    json!({
        "data": {
            "ipAddress": ip,
            "isPublic": true,
            "ipVersion": 4,
            "isWhitelisted": true,
            "abuseConfidenceScore": 0,
            "countryCode": country,
            "usageType": usage_type,
            "isp": "Google LLC",
            "domain": "google.com",
            "totalReports": 57,
            "numDistinctUsers": 12,
            "lastReportedAt": "2026-07-28T14:02:11+00:00"
        }
    })
}

#[allow(dead_code)]
pub fn ip2location_payload(ip: &str, country: &str, usage_type: &str) -> Value {
    json!({
        "ip": ip,
        "country_code": country,
        "country_name": "United States of America",
        "region_name": "California",
        "city_name": "Mountain View",
        "latitude": 37.40599,
        "longitude": -122.078514,
        "zip_code": "94043",
        "time_zone": "-07:00",
        "asn": "15169",
        "as": "Google LLC",
        "isp": "Google LLC",
        "usage_type": usage_type,
        "is_proxy": false
    })
}

#[allow(dead_code)]
pub fn cloudflare_payload(asn: u64, country: &str) -> Value {
    json!({
        "success": true,
        "errors": [],
        "result": {
            "asn": {
                "asn": asn,
                "name": "GOOGLE",
                "aka": "Google",
                "orgName": "Google LLC",
                "country": country,
                "countryName": "United States"
            }
        }
    })
}

/// Mounts happy-path responses for every provider for `ip` (ASN 15169).
#[allow(dead_code)]
pub async fn mount_happy_universe(server: &MockServer, ip: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ipguide/{ip}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ipguide_payload(ip, 15169, "US")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/ipinfo/{ip}/json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(ipinfo_payload(ip, "US", true)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/ipqs/api/json/ip/.+"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ipqs_payload("US", "Data Center")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/abuseipdb/api/v2/check"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(abuseipdb_payload(ip, "US", "Data Center/Web Hosting/Transit")),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ip2location/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ip2location_payload(ip, "US", "DCH")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cloudflare_asn/client/v4/radar/entities/asns/15169"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cloudflare_payload(15169, "US")))
        .mount(server)
        .await;
}
