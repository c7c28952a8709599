//! Provider payload projections.
//!
//! One transform per provider, turning the provider's JSON into the flat
//! normalized map. Transforms never fail: any shape deviation just leaves
//! the corresponding keys out of the output. Keys are prefixed with the
//! source name except for the intentionally shared merge keys (`asn`,
//! `country_code`, `fraud_score`, `abuse_score`, `total_reports`,
//! `last_reported_at`, `connection_type`, `usageType`).

use serde_json::{json, Value};

use crate::models::MergedMap;

/// Walks a path of object keys.
fn at<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = payload;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}

fn at_str(payload: &Value, path: &[&str]) -> Option<String> {
    at(payload, path)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn at_bool(payload: &Value, path: &[&str]) -> Option<bool> {
    at(payload, path).and_then(Value::as_bool)
}

fn at_num(payload: &Value, path: &[&str]) -> Option<Value> {
    at(payload, path).filter(|v| v.is_number()).cloned()
}

fn put(map: &mut MergedMap, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

fn put_str(map: &mut MergedMap, key: &str, value: Option<String>) {
    put(map, key, value.map(Value::String));
}

fn put_bool(map: &mut MergedMap, key: &str, value: Option<bool>) {
    put(map, key, value.map(Value::Bool));
}

/// Extracts ASN digits from values like `"AS15169"`, `"as15169"`, `15169`.
fn asn_digits(value: &Value) -> Option<String> {
    let text = match value {
        Value::Number(n) => return Some(n.to_string()),
        Value::String(s) => s.trim(),
        _ => return None,
    };
    let text = text
        .strip_prefix("AS")
        .or_else(|| text.strip_prefix("as"))
        .unwrap_or(text);
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    (!digits.is_empty()).then_some(digits)
}

// --- ip.guide (no key; supplies the ASN registry country) ---

pub(super) fn ipguide_check_error(payload: &Value) -> bool {
    payload.get("ip").is_none() && payload.get("network").is_none()
}

pub(super) fn ipguide_error_message(payload: &Value) -> String {
    at_str(payload, &["detail"]).unwrap_or_else(|| "ip.guide returned no data".to_string())
}

pub(super) fn ipguide_transform(payload: &Value) -> MergedMap {
    let mut map = MergedMap::new();
    put_str(&mut map, "ipguide_city", at_str(payload, &["location", "city"]));
    put_str(
        &mut map,
        "ipguide_country",
        at_str(payload, &["location", "country"]),
    );
    put_str(
        &mut map,
        "ipguide_timezone",
        at_str(payload, &["location", "timezone"]),
    );
    put(
        &mut map,
        "ipguide_latitude",
        at_num(payload, &["location", "latitude"]),
    );
    put(
        &mut map,
        "ipguide_longitude",
        at_num(payload, &["location", "longitude"]),
    );
    put_str(&mut map, "ipguide_cidr", at_str(payload, &["network", "cidr"]));

    if let Some(asn_value) = at(payload, &["network", "autonomous_system", "asn"]) {
        let digits = asn_digits(asn_value);
        put_str(&mut map, "ipguide_asn", digits.clone());
        put_str(&mut map, "asn", digits);
    }
    put_str(
        &mut map,
        "ipguide_asn_name",
        at_str(payload, &["network", "autonomous_system", "name"]),
    );
    put_str(
        &mut map,
        "ipguide_asn_org",
        at_str(payload, &["network", "autonomous_system", "organization"]),
    );
    put_str(
        &mut map,
        "ipguide_asn_country",
        at_str(payload, &["network", "autonomous_system", "country"]),
    );
    put_str(
        &mut map,
        "ipguide_rir",
        at_str(payload, &["network", "autonomous_system", "rir"]),
    );
    map
}

// --- ipinfo.io ---

pub(super) fn ipinfo_check_error(payload: &Value) -> bool {
    payload.get("error").is_some() || at_bool(payload, &["bogon"]) == Some(true)
}

pub(super) fn ipinfo_error_message(payload: &Value) -> String {
    if at_bool(payload, &["bogon"]) == Some(true) {
        return "bogon address".to_string();
    }
    at_str(payload, &["error", "message"])
        .or_else(|| at_str(payload, &["error", "title"]))
        .unwrap_or_else(|| "ipinfo lookup failed".to_string())
}

pub(super) fn ipinfo_transform(payload: &Value) -> MergedMap {
    let mut map = MergedMap::new();
    put_str(&mut map, "ipinfo_country", at_str(payload, &["country"]));
    put_str(&mut map, "ipinfo_city", at_str(payload, &["city"]));
    put_str(&mut map, "ipinfo_region", at_str(payload, &["region"]));
    put_str(&mut map, "ipinfo_timezone", at_str(payload, &["timezone"]));
    put_str(&mut map, "ipinfo_hostname", at_str(payload, &["hostname"]));
    put_str(&mut map, "ipinfo_postal", at_str(payload, &["postal"]));

    // "loc" is "lat,lon" in one string
    if let Some(loc) = at_str(payload, &["loc"]) {
        let mut parts = loc.splitn(2, ',');
        let latitude = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
        let longitude = parts.next().and_then(|p| p.trim().parse::<f64>().ok());
        if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
            put(&mut map, "ipinfo_latitude", Some(json!(latitude)));
            put(&mut map, "ipinfo_longitude", Some(json!(longitude)));
        }
    }

    // "org" is "AS15169 Google LLC"
    if let Some(org) = at_str(payload, &["org"]) {
        if let Some(digits) = asn_digits(&Value::String(org.clone())) {
            let org_name = org
                .split_once(' ')
                .map(|(_, rest)| rest.trim().to_string())
                .filter(|s| !s.is_empty());
            put_str(&mut map, "ipinfo_org", org_name.or(Some(org)));
            put_str(&mut map, "ipinfo_asn", Some(digits.clone()));
            put_str(&mut map, "asn", Some(digits));
        } else {
            put_str(&mut map, "ipinfo_org", Some(org));
        }
    }

    put_bool(&mut map, "ipinfo_vpn", at_bool(payload, &["privacy", "vpn"]));
    put_bool(&mut map, "ipinfo_proxy", at_bool(payload, &["privacy", "proxy"]));
    put_bool(&mut map, "ipinfo_tor", at_bool(payload, &["privacy", "tor"]));
    put_bool(&mut map, "ipinfo_relay", at_bool(payload, &["privacy", "relay"]));
    put_bool(
        &mut map,
        "ipinfo_hosting",
        at_bool(payload, &["privacy", "hosting"]),
    );
    map
}

// --- IPQualityScore ---

pub(super) fn ipqs_check_error(payload: &Value) -> bool {
    at_bool(payload, &["success"]) == Some(false)
}

pub(super) fn ipqs_error_message(payload: &Value) -> String {
    at_str(payload, &["message"]).unwrap_or_else(|| "IPQS reported failure".to_string())
}

pub(super) fn ipqs_transform(payload: &Value) -> MergedMap {
    let mut map = MergedMap::new();
    // Bare key on purpose: the usage-type vote reads it.
    put_str(
        &mut map,
        "connection_type",
        at_str(payload, &["connection_type"]),
    );
    put(&mut map, "fraud_score", at_num(payload, &["fraud_score"]));
    put(&mut map, "ipqs_fraud_score", at_num(payload, &["fraud_score"]));
    put_str(&mut map, "ipqs_isp", at_str(payload, &["ISP"]));
    put_str(
        &mut map,
        "ipqs_organization",
        at_str(payload, &["organization"]),
    );
    if let Some(asn) = payload.get("ASN").and_then(asn_digits) {
        put_str(&mut map, "ipqs_asn", Some(asn.clone()));
        put_str(&mut map, "asn", Some(asn));
    }
    put_str(&mut map, "ipqs_country", at_str(payload, &["country_code"]));
    put_str(&mut map, "country_code", at_str(payload, &["country_code"]));
    put_str(&mut map, "ipqs_city", at_str(payload, &["city"]));
    put_str(&mut map, "ipqs_region", at_str(payload, &["region"]));
    put_str(&mut map, "ipqs_timezone", at_str(payload, &["timezone"]));
    put(&mut map, "ipqs_latitude", at_num(payload, &["latitude"]));
    put(&mut map, "ipqs_longitude", at_num(payload, &["longitude"]));
    let vpn = at_bool(payload, &["vpn"]).unwrap_or(false)
        || at_bool(payload, &["active_vpn"]).unwrap_or(false);
    let tor = at_bool(payload, &["tor"]).unwrap_or(false)
        || at_bool(payload, &["active_tor"]).unwrap_or(false);
    put_bool(&mut map, "ipqs_vpn", Some(vpn));
    put_bool(&mut map, "ipqs_proxy", at_bool(payload, &["proxy"]));
    put_bool(&mut map, "ipqs_tor", Some(tor));
    put_bool(&mut map, "ipqs_mobile", at_bool(payload, &["mobile"]));
    put_bool(
        &mut map,
        "ipqs_recent_abuse",
        at_bool(payload, &["recent_abuse"]),
    );
    put_str(&mut map, "ipqs_bot_status", at_str(payload, &["bot_status"]));
    map
}

// --- AbuseIPDB ---

pub(super) fn abuseipdb_check_error(payload: &Value) -> bool {
    payload.get("errors").is_some() || payload.get("data").is_none()
}

pub(super) fn abuseipdb_error_message(payload: &Value) -> String {
    payload
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|e| e.get("detail"))
        .and_then(Value::as_str)
        .unwrap_or("AbuseIPDB returned no data")
        .to_string()
}

pub(super) fn abuseipdb_transform(payload: &Value) -> MergedMap {
    let mut map = MergedMap::new();
    let data = payload.get("data").unwrap_or(&Value::Null);
    // Bare key on purpose: the usage-type vote reads it.
    put_str(&mut map, "usageType", at_str(data, &["usageType"]));
    put_str(
        &mut map,
        "abuseipdb_usage_type",
        at_str(data, &["usageType"]),
    );
    put(
        &mut map,
        "abuse_score",
        at_num(data, &["abuseConfidenceScore"]),
    );
    put(
        &mut map,
        "abuseipdb_confidence_score",
        at_num(data, &["abuseConfidenceScore"]),
    );
    put(&mut map, "total_reports", at_num(data, &["totalReports"]));
    put(
        &mut map,
        "abuseipdb_total_reports",
        at_num(data, &["totalReports"]),
    );
    put_str(
        &mut map,
        "last_reported_at",
        at_str(data, &["lastReportedAt"]),
    );
    put_str(
        &mut map,
        "abuseipdb_last_reported_at",
        at_str(data, &["lastReportedAt"]),
    );
    put_str(&mut map, "abuseipdb_country", at_str(data, &["countryCode"]));
    put_str(&mut map, "country_code", at_str(data, &["countryCode"]));
    put_str(&mut map, "abuseipdb_isp", at_str(data, &["isp"]));
    put_str(&mut map, "abuseipdb_domain", at_str(data, &["domain"]));
    put_bool(
        &mut map,
        "abuseipdb_is_whitelisted",
        at_bool(data, &["isWhitelisted"]),
    );
    put(
        &mut map,
        "abuseipdb_num_users",
        at_num(data, &["numDistinctUsers"]),
    );
    map
}

pub(super) fn abuseipdb_raw(payload: &Value) -> Value {
    payload.get("data").cloned().unwrap_or(Value::Null)
}

// --- IP2Location.io ---

pub(super) fn ip2location_check_error(payload: &Value) -> bool {
    payload.get("error").is_some()
}

pub(super) fn ip2location_error_message(payload: &Value) -> String {
    at_str(payload, &["error", "error_message"])
        .unwrap_or_else(|| "IP2Location lookup failed".to_string())
}

pub(super) fn ip2location_transform(payload: &Value) -> MergedMap {
    let mut map = MergedMap::new();
    put_str(
        &mut map,
        "ip2location_country_code",
        at_str(payload, &["country_code"]),
    );
    put_str(&mut map, "country_code", at_str(payload, &["country_code"]));
    put_str(
        &mut map,
        "ip2location_country",
        at_str(payload, &["country_name"]),
    );
    put_str(
        &mut map,
        "ip2location_region",
        at_str(payload, &["region_name"]),
    );
    put_str(&mut map, "ip2location_city", at_str(payload, &["city_name"]));
    put_str(
        &mut map,
        "ip2location_timezone",
        at_str(payload, &["time_zone"]),
    );
    put(&mut map, "ip2location_latitude", at_num(payload, &["latitude"]));
    put(
        &mut map,
        "ip2location_longitude",
        at_num(payload, &["longitude"]),
    );
    put_str(&mut map, "ip2location_zip", at_str(payload, &["zip_code"]));
    put_str(&mut map, "ip2location_isp", at_str(payload, &["isp"]));
    // Bare usage code ("DCH", "ISP", "MOB", ...) read by the type vote.
    put_str(
        &mut map,
        "ip2location_usage",
        at_str(payload, &["usage_type"]),
    );
    if let Some(asn) = payload.get("asn").and_then(asn_digits) {
        put_str(&mut map, "ip2location_asn", Some(asn.clone()));
        put_str(&mut map, "asn", Some(asn));
    }
    put_str(&mut map, "ip2location_as_name", at_str(payload, &["as"]));
    put_bool(
        &mut map,
        "ip2location_is_proxy",
        at_bool(payload, &["is_proxy"]),
    );
    map
}

// --- Cloudflare Radar ASN entity (wave 2) ---

pub(super) fn cloudflare_check_error(payload: &Value) -> bool {
    at_bool(payload, &["success"]) == Some(false)
        || at(payload, &["result", "asn"]).is_none()
}

pub(super) fn cloudflare_error_message(payload: &Value) -> String {
    payload
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("Cloudflare ASN lookup failed")
        .to_string()
}

pub(super) fn cloudflare_transform(payload: &Value) -> MergedMap {
    let mut map = MergedMap::new();
    let asn = at(payload, &["result", "asn"]).unwrap_or(&Value::Null);
    if let Some(number) = asn.get("asn").and_then(asn_digits) {
        put_str(&mut map, "cloudflare_asn", Some(number));
    }
    put_str(&mut map, "cloudflare_asn_name", at_str(asn, &["name"]));
    put_str(&mut map, "cloudflare_asn_org", at_str(asn, &["orgName"]));
    put_str(&mut map, "cloudflare_asn_country", at_str(asn, &["country"]));
    put_str(
        &mut map,
        "cloudflare_asn_country_name",
        at_str(asn, &["countryName"]),
    );
    put_str(&mut map, "cloudflare_asn_aka", at_str(asn, &["aka"]));
    map
}

pub(super) fn cloudflare_raw(payload: &Value) -> Value {
    at(payload, &["result", "asn"]).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{get_bool, get_str};
    use serde_json::json;

    #[test]
    fn test_asn_digits_variants() {
        assert_eq!(asn_digits(&json!("AS15169")), Some("15169".into()));
        assert_eq!(asn_digits(&json!("as13335")), Some("13335".into()));
        assert_eq!(asn_digits(&json!(15169)), Some("15169".into()));
        assert_eq!(asn_digits(&json!("AS15169 Google LLC")), Some("15169".into()));
        assert_eq!(asn_digits(&json!("Google")), None);
        assert_eq!(asn_digits(&json!(null)), None);
    }

    #[test]
    fn test_ipguide_transform_full_payload() {
        let payload = json!({
            "ip": "8.8.8.8",
            "network": {
                "cidr": "8.8.8.0/24",
                "autonomous_system": {
                    "asn": 15169,
                    "name": "GOOGLE",
                    "organization": "Google LLC",
                    "country": "US",
                    "rir": "ARIN"
                }
            },
            "location": {
                "city": "Mountain View",
                "country": "United States",
                "timezone": "America/Los_Angeles",
                "latitude": 37.4,
                "longitude": -122.07
            }
        });
        let map = ipguide_transform(&payload);
        assert_eq!(get_str(&map, "asn"), Some("15169"));
        assert_eq!(get_str(&map, "ipguide_asn_country"), Some("US"));
        assert_eq!(get_str(&map, "ipguide_city"), Some("Mountain View"));
        assert!(!ipguide_check_error(&payload));
    }

    #[test]
    fn test_ipguide_transform_never_panics_on_junk() {
        for payload in [json!(null), json!([]), json!({"network": "nope"}), json!(42)] {
            let _ = ipguide_transform(&payload);
        }
    }

    #[test]
    fn test_ipinfo_transform_org_and_loc_split() {
        let payload = json!({
            "ip": "8.8.8.8",
            "city": "Mountain View",
            "country": "US",
            "loc": "37.4056,-122.0775",
            "org": "AS15169 Google LLC",
            "privacy": {"vpn": false, "proxy": false, "tor": false, "hosting": true}
        });
        let map = ipinfo_transform(&payload);
        assert_eq!(get_str(&map, "asn"), Some("15169"));
        assert_eq!(get_str(&map, "ipinfo_org"), Some("Google LLC"));
        assert_eq!(map.get("ipinfo_latitude"), Some(&json!(37.4056)));
        assert_eq!(get_bool(&map, "ipinfo_hosting"), Some(true));
    }

    #[test]
    fn test_ipinfo_bogon_is_logical_error() {
        let payload = json!({"ip": "10.0.0.1", "bogon": true});
        assert!(ipinfo_check_error(&payload));
        assert_eq!(ipinfo_error_message(&payload), "bogon address");
    }

    #[test]
    fn test_ipqs_success_false_detected() {
        let payload = json!({"success": false, "message": "Invalid API key"});
        assert!(ipqs_check_error(&payload));
        assert_eq!(ipqs_error_message(&payload), "Invalid API key");
    }

    #[test]
    fn test_ipqs_transform_risk_flags() {
        let payload = json!({
            "success": true,
            "fraud_score": 82,
            "connection_type": "Data Center",
            "vpn": false,
            "active_vpn": true,
            "proxy": true,
            "tor": false,
            "ASN": 15169,
            "country_code": "US"
        });
        let map = ipqs_transform(&payload);
        assert_eq!(get_bool(&map, "ipqs_vpn"), Some(true));
        assert_eq!(get_bool(&map, "ipqs_proxy"), Some(true));
        assert_eq!(get_bool(&map, "ipqs_tor"), Some(false));
        assert_eq!(get_str(&map, "connection_type"), Some("Data Center"));
        assert_eq!(map.get("fraud_score"), Some(&json!(82)));
    }

    #[test]
    fn test_abuseipdb_transform_reads_nested_data() {
        let payload = json!({
            "data": {
                "abuseConfidenceScore": 0,
                "usageType": "Data Center/Web Hosting/Transit",
                "countryCode": "US",
                "isp": "Google LLC",
                "totalReports": 42,
                "lastReportedAt": "2026-07-01T10:00:00+00:00"
            }
        });
        assert!(!abuseipdb_check_error(&payload));
        let map = abuseipdb_transform(&payload);
        assert_eq!(
            get_str(&map, "usageType"),
            Some("Data Center/Web Hosting/Transit")
        );
        assert_eq!(map.get("total_reports"), Some(&json!(42)));
        assert_eq!(abuseipdb_raw(&payload)["isp"], json!("Google LLC"));
    }

    #[test]
    fn test_abuseipdb_error_payload() {
        let payload = json!({"errors": [{"detail": "Daily rate limit of 1000 exceeded", "status": 429}]});
        assert!(abuseipdb_check_error(&payload));
        assert!(abuseipdb_error_message(&payload).contains("rate limit"));
    }

    #[test]
    fn test_ip2location_transform() {
        let payload = json!({
            "country_code": "US",
            "country_name": "United States",
            "usage_type": "DCH",
            "asn": "15169",
            "as": "Google LLC",
            "is_proxy": false
        });
        let map = ip2location_transform(&payload);
        assert_eq!(get_str(&map, "ip2location_usage"), Some("DCH"));
        assert_eq!(get_str(&map, "ip2location_country_code"), Some("US"));
        assert_eq!(get_str(&map, "asn"), Some("15169"));
    }

    #[test]
    fn test_cloudflare_transform_and_error() {
        let ok = json!({
            "success": true,
            "result": {"asn": {"asn": 15169, "name": "GOOGLE", "orgName": "Google LLC", "country": "US", "countryName": "United States"}}
        });
        assert!(!cloudflare_check_error(&ok));
        let map = cloudflare_transform(&ok);
        assert_eq!(get_str(&map, "cloudflare_asn_org"), Some("Google LLC"));
        assert_eq!(get_str(&map, "cloudflare_asn"), Some("15169"));

        let err = json!({"success": false, "errors": [{"message": "Invalid token"}]});
        assert!(cloudflare_check_error(&err));
        assert_eq!(cloudflare_error_message(&err), "Invalid token");
    }
}
