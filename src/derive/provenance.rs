//! Per-field provenance.
//!
//! For each user-visible field the UI can show which providers supplied a
//! value and what each said. The chosen value is the first non-empty one in
//! the fixed source order; the sources list carries everything non-empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{get_f64, get_str, scalar_to_string, MergedMap};

/// One provider's value for a field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldSource {
    /// Display label of the provider.
    pub source: String,
    /// The value it supplied.
    pub value: Value,
}

/// A field's chosen value plus everything the providers said.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FieldProvenance {
    /// First non-empty value in source order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Every provider that supplied a non-empty value.
    pub sources: Vec<FieldSource>,
}

/// The provenance table for the user-visible fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTable {
    /// Timezone candidates.
    pub timezone: FieldProvenance,
    /// ISP candidates.
    pub isp: FieldProvenance,
    /// Organization candidates.
    pub organization: FieldProvenance,
    /// ASN candidates.
    pub asn: FieldProvenance,
    /// "lat, lon" candidates.
    pub coordinates: FieldProvenance,
    /// Place-string candidates.
    pub location: FieldProvenance,
    /// Usage-type vote, as provenance.
    pub ip_type: FieldProvenance,
}

enum FieldSpec {
    /// One merged-map key.
    Single(&'static str),
    /// Latitude/longitude pair rendered as `"lat, lon"`.
    Coords(&'static str, &'static str),
    /// City/region/country triple rendered as a comma-joined place string.
    Place(&'static str, Option<&'static str>, &'static str),
}

fn resolve(merged: &MergedMap, spec: &FieldSpec) -> Option<Value> {
    match spec {
        FieldSpec::Single(key) => merged.get(*key).cloned().filter(|v| !v.is_null()),
        FieldSpec::Coords(lat_key, lon_key) => {
            let latitude = get_f64(merged, lat_key)?;
            let longitude = get_f64(merged, lon_key)?;
            Some(Value::String(format!("{latitude}, {longitude}")))
        }
        FieldSpec::Place(city_key, region_key, country_key) => {
            let parts: Vec<String> = [
                get_str(merged, city_key),
                region_key.and_then(|key| get_str(merged, key)),
                get_str(merged, country_key),
            ]
            .into_iter()
            .flatten()
            .map(str::to_string)
            .collect();
            (!parts.is_empty()).then(|| Value::String(parts.join(", ")))
        }
    }
}

fn collect(merged: &MergedMap, specs: &[(&str, FieldSpec)]) -> FieldProvenance {
    let mut provenance = FieldProvenance::default();
    for (label, spec) in specs {
        let Some(value) = resolve(merged, spec) else {
            continue;
        };
        // Skip values that don't render to anything displayable.
        if scalar_to_string(&value).is_none() {
            continue;
        }
        if provenance.value.is_none() {
            provenance.value = Some(value.clone());
        }
        provenance.sources.push(FieldSource {
            source: label.to_string(),
            value,
        });
    }
    provenance
}

/// Builds the provenance table from the merged map.
///
/// `ip_type` is filled separately by the caller from the vote detail, since
/// its value is the vote winner rather than a merged-map read.
pub fn build_field_table(merged: &MergedMap) -> FieldTable {
    FieldTable {
        timezone: collect(
            merged,
            &[
                ("IP2Location", FieldSpec::Single("ip2location_timezone")),
                ("IPQS", FieldSpec::Single("ipqs_timezone")),
                ("ipinfo", FieldSpec::Single("ipinfo_timezone")),
                ("ip.guide", FieldSpec::Single("ipguide_timezone")),
            ],
        ),
        isp: collect(
            merged,
            &[
                ("IPQS", FieldSpec::Single("ipqs_isp")),
                ("IP2Location", FieldSpec::Single("ip2location_isp")),
                ("AbuseIPDB", FieldSpec::Single("abuseipdb_isp")),
                ("ipinfo", FieldSpec::Single("ipinfo_org")),
            ],
        ),
        organization: collect(
            merged,
            &[
                ("IPQS", FieldSpec::Single("ipqs_organization")),
                ("ipinfo", FieldSpec::Single("ipinfo_org")),
                ("Cloudflare", FieldSpec::Single("cloudflare_asn_org")),
                ("ip.guide", FieldSpec::Single("ipguide_asn_org")),
            ],
        ),
        asn: collect(
            merged,
            &[
                ("IPQS", FieldSpec::Single("ipqs_asn")),
                ("IP2Location", FieldSpec::Single("ip2location_asn")),
                ("ipinfo", FieldSpec::Single("ipinfo_asn")),
                ("ip.guide", FieldSpec::Single("ipguide_asn")),
                ("Cloudflare", FieldSpec::Single("cloudflare_asn")),
            ],
        ),
        coordinates: collect(
            merged,
            &[
                (
                    "IP2Location",
                    FieldSpec::Coords("ip2location_latitude", "ip2location_longitude"),
                ),
                ("IPQS", FieldSpec::Coords("ipqs_latitude", "ipqs_longitude")),
                ("ipinfo", FieldSpec::Coords("ipinfo_latitude", "ipinfo_longitude")),
                (
                    "ip.guide",
                    FieldSpec::Coords("ipguide_latitude", "ipguide_longitude"),
                ),
            ],
        ),
        location: collect(
            merged,
            &[
                (
                    "IP2Location",
                    FieldSpec::Place(
                        "ip2location_city",
                        Some("ip2location_region"),
                        "ip2location_country_code",
                    ),
                ),
                (
                    "IPQS",
                    FieldSpec::Place("ipqs_city", Some("ipqs_region"), "ipqs_country"),
                ),
                (
                    "ipinfo",
                    FieldSpec::Place("ipinfo_city", Some("ipinfo_region"), "ipinfo_country"),
                ),
                (
                    "ip.guide",
                    FieldSpec::Place("ipguide_city", None, "ipguide_country"),
                ),
            ],
        ),
        ip_type: FieldProvenance::default(),
    }
}
