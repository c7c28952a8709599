//! Derivation of the user-visible record from a merged bundle.
//!
//! This layer is pure: given the same bundle and timestamp it produces the
//! same record. It reads the merged map only through source-specific keys
//! (plus the intentionally shared ones), so wave-internal merge order never
//! changes a conclusion.

mod ip_type;
mod native;
mod provenance;

pub use ip_type::{normalize_type, vote, IpType, TypeSourceDetail};
pub use native::{judge_native, IpSourceSummary};
pub use provenance::{build_field_table, FieldProvenance, FieldSource, FieldTable};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    get_bool, get_f64, get_i64, get_str, CfData, IpBundle, MergedMap,
};

/// Geographic summary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSummary {
    /// City name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// Region/state name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Uppercased ISO country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// IANA zone or UTC offset, as the winning provider reported it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Latitude in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Longitude in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// "City, Region, Country" with absent parts skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_str: Option<String>,
}

/// Network ownership summary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    /// Internet service provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    /// Owning organization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// ASN digits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<String>,
}

/// Usage-type vote result.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpTypeSummary {
    /// Winning normalized category.
    pub value: IpType,
    /// Raw label of the first candidate that voted for the winner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_label: Option<String>,
    /// Every non-unknown vote, in the pinned source order.
    pub sources: Vec<TypeSourceDetail>,
}

/// Risk indicators collected across providers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    /// IPQS fraud score (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_score: Option<i64>,
    /// AbuseIPDB confidence score (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abuse_score: Option<i64>,
    /// AbuseIPDB report count in the lookback window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_reports: Option<i64>,
    /// Timestamp of the most recent abuse report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reported_at: Option<String>,
    /// Any provider flagged the IP as a VPN endpoint.
    pub is_vpn: bool,
    /// Any provider flagged the IP as a proxy.
    pub is_proxy: bool,
    /// Any provider flagged the IP as a Tor exit.
    pub is_tor: bool,
    /// Hosting judgment; see the type-vote rules.
    pub is_hosting: bool,
}

/// Edge-side observations passed through from the edge snapshot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSummary {
    /// Edge colo code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colo: Option<String>,
    /// ASN observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    /// Country observed at the edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Bot-management score.
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

/// Everything the UI shows about one IP, at a glance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Where the IP is.
    pub location: LocationSummary,
    /// Who owns it.
    pub network: NetworkSummary,
    /// What kind of connection it is.
    pub ip_type: IpTypeSummary,
    /// Native-vs-broadcast judgment.
    pub ip_source: IpSourceSummary,
    /// Risk indicators.
    pub risk: RiskSummary,
    /// Edge observations, when an edge snapshot was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeSummary>,
}

/// Per-provider report in the derived record.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReport {
    /// `"success"` or `"error"`.
    pub status: String,
    /// Normalized map, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MergedMap>,
    /// Preserved raw payload, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
    /// Failure message, on error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Provider attribution entry for `meta.apiErrors`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    /// Provider id.
    pub source: String,
    /// Failure message.
    pub error: String,
}

/// Result metadata: what ran, what failed, what came from cache.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Successful source ids, in completion order.
    pub sources: Vec<String>,
    /// Per-provider failures.
    pub api_errors: Vec<ApiErrorEntry>,
    /// True when served from the merged-record cache.
    pub cached: bool,
    pub cached_api_count: usize,
    pub total_api_count: usize,
    /// Derivation time, epoch milliseconds.
    pub timestamp: i64,
}

/// The user-visible aggregation result.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedRecord {
    /// The target IP, exactly as supplied.
    pub ip: String,
    /// At-a-glance summary.
    pub summary: Summary,
    /// Per-field provenance table.
    pub fields: FieldTable,
    /// Per-provider reports, keyed by source id.
    pub providers: BTreeMap<String, ProviderReport>,
    /// Result metadata.
    pub meta: Meta,
}

/// Pinned candidate order for the type vote. The tie-break depends on it.
fn type_candidates(merged: &MergedMap) -> Vec<TypeSourceDetail> {
    let mut candidates = Vec::new();
    let mut push = |source: &str, raw: Option<&str>| {
        if let Some(raw) = raw {
            candidates.push(TypeSourceDetail {
                source: source.to_string(),
                raw_type: raw.to_string(),
                normalized_type: normalize_type(raw),
            });
        }
    };
    push("IPQS", get_str(merged, "connection_type"));
    push("AbuseIPDB", get_str(merged, "usageType"));
    push("IP2Location", get_str(merged, "ip2location_usage"));
    if get_bool(merged, "ipinfo_hosting") == Some(true) {
        push("ipinfo", Some("hosting"));
    }
    candidates
}

fn first_str(merged: &MergedMap, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| get_str(merged, key))
        .map(str::to_string)
}

fn any_true(merged: &MergedMap, keys: &[&str]) -> bool {
    keys.iter().any(|key| get_bool(merged, key) == Some(true))
}

fn build_location(merged: &MergedMap) -> LocationSummary {
    let city = first_str(merged, &["ip2location_city", "ipqs_city", "ipinfo_city", "ipguide_city"]);
    let region = first_str(merged, &["ip2location_region", "ipqs_region", "ipinfo_region"]);
    let country = first_str(
        merged,
        &["ip2location_country_code", "country_code", "ipinfo_country"],
    )
    .map(|c| c.to_uppercase());
    let timezone = first_str(
        merged,
        &[
            "ip2location_timezone",
            "ipqs_timezone",
            "ipinfo_timezone",
            "ipguide_timezone",
        ],
    );

    // Coordinates come as a pair from whichever source has both first.
    let mut latitude = None;
    let mut longitude = None;
    for prefix in ["ip2location", "ipqs", "ipinfo", "ipguide"] {
        let lat = get_f64(merged, &format!("{prefix}_latitude"));
        let lon = get_f64(merged, &format!("{prefix}_longitude"));
        if let (Some(lat), Some(lon)) = (lat, lon) {
            latitude = Some(lat);
            longitude = Some(lon);
            break;
        }
    }

    let parts: Vec<&str> = [city.as_deref(), region.as_deref(), country.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    let location_str = (!parts.is_empty()).then(|| parts.join(", "));

    LocationSummary {
        city,
        region,
        country,
        timezone,
        latitude,
        longitude,
        location_str,
    }
}

fn build_risk(merged: &MergedMap, ip_type: &IpTypeSummary) -> RiskSummary {
    // The hosting flag is deliberately belt-and-braces: the vote winner, the
    // ipinfo privacy flag, or any single raw label normalizing to
    // datacenter each suffice on their own.
    let any_raw_datacenter = ip_type
        .sources
        .iter()
        .any(|detail| detail.normalized_type == IpType::Datacenter);
    let is_hosting = ip_type.value == IpType::Datacenter
        || get_bool(merged, "ipinfo_hosting") == Some(true)
        || any_raw_datacenter;

    RiskSummary {
        fraud_score: get_i64(merged, "fraud_score"),
        abuse_score: get_i64(merged, "abuse_score"),
        total_reports: get_i64(merged, "total_reports"),
        last_reported_at: get_str(merged, "last_reported_at").map(str::to_string),
        is_vpn: any_true(merged, &["ipqs_vpn", "ipinfo_vpn"]),
        is_proxy: any_true(merged, &["ipqs_proxy", "ipinfo_proxy", "ip2location_is_proxy"]),
        is_tor: any_true(merged, &["ipqs_tor", "ipinfo_tor"]),
        is_hosting,
    }
}

fn build_edge(cf_data: Option<&CfData>) -> Option<EdgeSummary> {
    let cf = cf_data?;
    Some(EdgeSummary {
        colo: cf.colo.clone(),
        asn: cf.asn,
        country: cf.country.clone(),
        bot_score: cf.bot_score,
        is_warp: cf.is_warp,
        tls_version: cf.tls_version.clone(),
        http_protocol: cf.http_protocol.clone(),
    })
}

/// Derives the user-visible record from an aggregation bundle.
///
/// Pure: no clock, no I/O; `timestamp` is supplied by the caller.
pub fn build_record(bundle: &IpBundle, cf_data: Option<&CfData>, timestamp: i64) -> DerivedRecord {
    let merged = &bundle.merged;

    let candidates = type_candidates(merged);
    let (value, raw_label) = vote(&candidates);
    let ip_type = IpTypeSummary {
        value,
        raw_label,
        sources: candidates
            .into_iter()
            .filter(|c| c.normalized_type != IpType::Unknown)
            .collect(),
    };

    let mut fields = build_field_table(merged);
    if ip_type.value != IpType::Unknown {
        fields.ip_type = FieldProvenance {
            value: Some(Value::String(ip_type.value.to_string())),
            sources: ip_type
                .sources
                .iter()
                .map(|detail| FieldSource {
                    source: detail.source.clone(),
                    value: Value::String(detail.raw_type.clone()),
                })
                .collect(),
        };
    }

    let network = NetworkSummary {
        isp: first_str(
            merged,
            &["ipqs_isp", "ip2location_isp", "abuseipdb_isp", "ipinfo_org"],
        ),
        organization: first_str(
            merged,
            &[
                "ipqs_organization",
                "ipinfo_org",
                "cloudflare_asn_org",
                "ipguide_asn_org",
            ],
        ),
        asn: bundle.asn.clone(),
    };

    let risk = build_risk(merged, &ip_type);

    let providers = bundle
        .successful
        .iter()
        .map(|success| {
            (
                success.source.clone(),
                ProviderReport {
                    status: "success".to_string(),
                    data: Some(success.data.clone()),
                    raw_data: success.raw_data.clone(),
                    error: None,
                },
            )
        })
        .chain(bundle.errors.iter().map(|failure| {
            (
                failure.source.clone(),
                ProviderReport {
                    status: "error".to_string(),
                    data: None,
                    raw_data: None,
                    error: Some(failure.error.clone()),
                },
            )
        }))
        .collect();

    DerivedRecord {
        ip: bundle.ip.clone(),
        summary: Summary {
            location: build_location(merged),
            network,
            ip_type,
            ip_source: judge_native(merged),
            risk,
            edge: build_edge(cf_data),
        },
        fields,
        providers,
        meta: Meta {
            sources: bundle.source_names(),
            api_errors: bundle
                .errors
                .iter()
                .map(|failure| ApiErrorEntry {
                    source: failure.source.clone(),
                    error: failure.error.clone(),
                })
                .collect(),
            cached: bundle.partially_from_cache,
            cached_api_count: bundle.cached_api_count,
            total_api_count: bundle.total_api_count,
            timestamp,
        },
    }
}
