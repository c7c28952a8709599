//! Core data model shared across the aggregation pipeline.
//!
//! Provider responses are normalized into flat string→scalar maps
//! ([`MergedMap`]) with source-prefixed keys, then shallow-overlaid into a
//! single merged record. The typed accessors here are the only way the
//! derivation layer reads that map.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Flat normalized projection of a provider payload.
///
/// Keys are namespaced by source prefix (`ipinfo_country`,
/// `ip2location_asn`, ...) except for a small set of intentionally shared
/// keys (`asn`, `country_code`, `fraud_score`, ...) where last-writer-wins
/// overlay is the point.
pub type MergedMap = serde_json::Map<String, Value>;

/// Successful provider fetch: the normalized map plus the preserved raw
/// payload for debugging and per-field provenance in the UI.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSuccess {
    /// Stable provider identifier (e.g. `"ipinfo"`).
    pub source: String,
    /// Flat normalized map with namespaced keys.
    pub data: MergedMap,
    /// Opaque preserved payload, if the provider defines a raw projection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
}

/// Failed provider fetch. Never fatal to aggregation; folded into
/// `meta.apiErrors`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Stable provider identifier.
    pub source: String,
    /// Human-readable failure message.
    pub error: String,
}

/// Outcome of one provider fetch for one IP.
pub type ProviderOutcome = Result<ProviderSuccess, ProviderFailure>;

/// Result of aggregating one IP across all enabled providers.
///
/// This is also the shape persisted in the merged-record cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpBundle {
    /// The target IP, exactly as supplied.
    pub ip: String,
    /// ASN discovered during wave 1 (or supplied as a hint), as digits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
    /// Providers that returned data, in completion order.
    pub successful: Vec<ProviderSuccess>,
    /// Providers that failed, in completion order.
    pub errors: Vec<ProviderFailure>,
    /// Shallow overlay of all successful maps, completion order per wave.
    pub merged: MergedMap,
    /// True when this bundle was served from cache.
    #[serde(default)]
    pub partially_from_cache: bool,
    /// How many of the provider results came from cache.
    #[serde(default)]
    pub cached_api_count: usize,
    /// Total providers attempted (successful + errors).
    #[serde(default)]
    pub total_api_count: usize,
}

impl IpBundle {
    /// Source names of the successful providers, in completion order.
    pub fn source_names(&self) -> Vec<String> {
        self.successful.iter().map(|s| s.source.clone()).collect()
    }
}

/// Pre-known per-exit data supplied by the edge layer.
///
/// Authoritative for colo/TLS observations; subordinate to provider
/// responses for geography and ASN once aggregation has run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfData {
    /// Client IP observed at the edge for this exit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// Edge colo (IATA-style code).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colo: Option<String>,
    /// ASN observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    /// Country observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// City observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Latitude observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Bot-management score, when the edge supplies one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_score: Option<u32>,
    /// Whether the request arrived over WARP.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_warp: Option<bool>,
    /// TLS version observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_version: Option<String>,
    /// HTTP protocol observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_protocol: Option<String>,
}

/// Validates a textual IP address, stripping an optional zone id
/// (`fe80::1%eth0` → `fe80::1`). Returns the canonical-but-unrewritten text
/// the caller supplied; the service transports addresses, it never rewrites
/// them.
pub fn normalize_ip(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let without_zone = trimmed.split('%').next().unwrap_or(trimmed);
    without_zone
        .parse::<std::net::IpAddr>()
        .ok()
        .map(|_| without_zone.to_string())
}

/// Reads a string value from a merged map, treating empty strings as absent.
pub fn get_str<'a>(map: &'a MergedMap, key: &str) -> Option<&'a str> {
    map.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Reads a boolean value from a merged map.
pub fn get_bool(map: &MergedMap, key: &str) -> Option<bool> {
    map.get(key).and_then(Value::as_bool)
}

/// Reads a float, accepting both JSON numbers and numeric strings
/// (providers disagree on how they encode coordinates and scores).
pub fn get_f64(map: &MergedMap, key: &str) -> Option<f64> {
    match map.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads an integer, accepting both JSON numbers and numeric strings.
pub fn get_i64(map: &MergedMap, key: &str) -> Option<i64> {
    match map.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Renders any scalar value as a display string; `None` for null/absent,
/// empty strings, and non-scalar values.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, Value)]) -> MergedMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_normalize_ip_accepts_v4_and_v6() {
        assert_eq!(normalize_ip("8.8.8.8"), Some("8.8.8.8".into()));
        assert_eq!(normalize_ip(" 2001:db8::1 "), Some("2001:db8::1".into()));
        assert_eq!(normalize_ip("fe80::1%eth0"), Some("fe80::1".into()));
    }

    #[test]
    fn test_normalize_ip_rejects_non_ips() {
        assert_eq!(normalize_ip("example.com"), None);
        assert_eq!(normalize_ip("999.1.1.1"), None);
        assert_eq!(normalize_ip(""), None);
        assert_eq!(normalize_ip("8.8.8.8/24"), None);
    }

    #[test]
    fn test_get_str_ignores_empty() {
        let m = map(&[("a", json!("x")), ("b", json!("")), ("c", json!("  "))]);
        assert_eq!(get_str(&m, "a"), Some("x"));
        assert_eq!(get_str(&m, "b"), None);
        assert_eq!(get_str(&m, "c"), None);
        assert_eq!(get_str(&m, "missing"), None);
    }

    #[test]
    fn test_get_f64_accepts_numeric_strings() {
        let m = map(&[("n", json!(37.4)), ("s", json!("37.4")), ("bad", json!("x"))]);
        assert_eq!(get_f64(&m, "n"), Some(37.4));
        assert_eq!(get_f64(&m, "s"), Some(37.4));
        assert_eq!(get_f64(&m, "bad"), None);
    }

    #[test]
    fn test_get_i64_accepts_numeric_strings() {
        let m = map(&[("n", json!(15169)), ("s", json!("15169"))]);
        assert_eq!(get_i64(&m, "n"), Some(15169));
        assert_eq!(get_i64(&m, "s"), Some(15169));
    }

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&json!("a")), Some("a".into()));
        assert_eq!(scalar_to_string(&json!(3)), Some("3".into()));
        assert_eq!(scalar_to_string(&json!(true)), Some("true".into()));
        assert_eq!(scalar_to_string(&json!(null)), None);
        assert_eq!(scalar_to_string(&json!({"x": 1})), None);
    }

    #[test]
    fn test_bundle_roundtrips_through_json() {
        let bundle = IpBundle {
            ip: "8.8.8.8".into(),
            asn: Some("15169".into()),
            successful: vec![ProviderSuccess {
                source: "ipinfo".into(),
                data: map(&[("ipinfo_country", json!("US"))]),
                raw_data: None,
            }],
            errors: vec![ProviderFailure {
                source: "ipqs".into(),
                error: "boom".into(),
            }],
            merged: map(&[("country_code", json!("US"))]),
            partially_from_cache: false,
            cached_api_count: 0,
            total_api_count: 2,
        };
        let text = serde_json::to_string(&bundle).unwrap();
        let back: IpBundle = serde_json::from_str(&text).unwrap();
        assert_eq!(back.ip, "8.8.8.8");
        assert_eq!(back.source_names(), vec!["ipinfo"]);
        assert_eq!(back.errors[0].source, "ipqs");
        assert_eq!(back.total_api_count, 2);
    }
}
