//! Native-vs-broadcast judgment.
//!
//! Compares where the IP geolocates against where its ASN is registered.
//! A match means the IP is "native"; a mismatch means it is announced
//! outside its registry country ("broadcast").

use serde::{Deserialize, Serialize};

use crate::models::{get_str, MergedMap};

/// Geo-vs-registry comparison result.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpSourceSummary {
    /// Country the IP geolocates to (uppercased ISO code).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_country: Option<String>,
    /// Country the ASN is registered in (uppercased ISO code).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_country: Option<String>,
    /// `Some(true)` native, `Some(false)` broadcast, `None` undecidable.
    pub is_native: Option<bool>,
    /// Human explanation of the judgment.
    pub reason: String,
}

/// Geo-country precedence: the dedicated geo providers first, then the
/// shared merge key, then ipinfo.
const GEO_COUNTRY_KEYS: &[&str] = &["ip2location_country_code", "country_code", "ipinfo_country"];

/// Judges native vs. broadcast from the merged map.
pub fn judge_native(merged: &MergedMap) -> IpSourceSummary {
    let geo_country = GEO_COUNTRY_KEYS
        .iter()
        .find_map(|key| get_str(merged, key))
        .map(str::to_uppercase);
    let registry_country = get_str(merged, "ipguide_asn_country").map(str::to_uppercase);

    let (is_native, reason) = match (geo_country.as_deref(), registry_country.as_deref()) {
        (Some(geo), Some(registry)) if geo == registry => {
            (Some(true), format!("registry == geo ({geo})"))
        }
        (Some(geo), Some(registry)) => {
            (Some(false), format!("registry {registry}, geo {geo}"))
        }
        (Some(geo), None) => (None, format!("registry country unknown (geo {geo})")),
        (None, Some(registry)) => (None, format!("geo country unknown (registry {registry})")),
        (None, None) => (None, "insufficient data".to_string()),
    };

    IpSourceSummary {
        geo_country,
        registry_country,
        is_native,
        reason,
    }
}
