//! Provider registry.
//!
//! Each reputation/geolocation provider is described declaratively: how to
//! build the request for a target, how to recognize a logical failure inside
//! a 200 response, and how to project the payload into the flat normalized
//! map used for merging. The registry itself is a static table; everything
//! request-shaped lives in data, not in per-provider code paths.

mod transforms;

use serde_json::Value;

use crate::config::{Config, ABUSEIPDB_MAX_AGE_DAYS};
use crate::models::MergedMap;

/// Which fetch wave a provider belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderGroup {
    /// Fetched in wave 1 without credentials.
    NoKey,
    /// Fetched in wave 1 with a key from the provider's pool.
    Keyed,
    /// Fetched in wave 2, keyed, once the ASN is known.
    AsnDependent,
}

/// Declarative description of one provider.
pub struct Provider {
    /// Stable identifier; also the provider's credential-pool name.
    pub name: &'static str,
    /// Fetch wave and credential requirements.
    pub group: ProviderGroup,
    /// Scheme + host of the real endpoint.
    pub base_url: &'static str,
    /// Builds path + query for a target (IP, or ASN digits for
    /// [`ProviderGroup::AsnDependent`]). The key is embedded here for
    /// key-in-URL and key-as-query providers.
    pub path_and_query: fn(target: &str, key: Option<&str>) -> String,
    /// Extra request headers; receives the key for key-as-header providers.
    pub headers: fn(key: Option<&str>) -> Vec<(&'static str, String)>,
    /// True when a 200 response semantically means failure.
    pub check_error: fn(payload: &Value) -> bool,
    /// Human message for a payload where `check_error` fired.
    pub error_message: fn(payload: &Value) -> String,
    /// Projects the payload into the flat normalized map. Must tolerate any
    /// shape deviation; missing fields are simply absent from the output.
    pub transform: fn(payload: &Value) -> MergedMap,
    /// Optional narrower projection preserved as `rawData` for the UI.
    /// `None` preserves the payload as-is.
    pub raw_transform: Option<fn(payload: &Value) -> Value>,
}

impl Provider {
    /// Whether this provider can run under the given configuration.
    pub fn enabled(&self, config: &Config) -> bool {
        match self.group {
            ProviderGroup::NoKey => true,
            _ => !config.credentials(self.name).is_empty(),
        }
    }

    /// Whether provider calls consume a credential pool.
    pub fn needs_key(&self) -> bool {
        !matches!(self.group, ProviderGroup::NoKey)
    }

    /// Full request URL for a target.
    ///
    /// `base_override` reroutes the call to
    /// `<override>/<provider-name><path>` so tests can stand up one mock
    /// server for the whole provider universe.
    pub fn url(&self, target: &str, key: Option<&str>, base_override: Option<&str>) -> String {
        let path = (self.path_and_query)(target, key);
        match base_override {
            Some(base) => format!("{}/{}{}", base.trim_end_matches('/'), self.name, path),
            None => format!("{}{}", self.base_url, path),
        }
    }
}

fn no_headers(_key: Option<&str>) -> Vec<(&'static str, String)> {
    Vec::new()
}

fn abuseipdb_headers(key: Option<&str>) -> Vec<(&'static str, String)> {
    let mut headers = vec![("Accept", "application/json".to_string())];
    if let Some(key) = key {
        headers.push(("Key", key.to_string()));
    }
    headers
}

fn cloudflare_headers(key: Option<&str>) -> Vec<(&'static str, String)> {
    match key {
        Some(key) => vec![("Authorization", format!("Bearer {key}"))],
        None => Vec::new(),
    }
}

/// The static provider table. Order here fixes attempt order within a wave
/// (completion order still decides merge order).
pub static PROVIDERS: &[Provider] = &[
    Provider {
        name: "ipguide",
        group: ProviderGroup::NoKey,
        base_url: "https://ip.guide",
        path_and_query: |ip, _| format!("/{ip}"),
        headers: no_headers,
        check_error: transforms::ipguide_check_error,
        error_message: transforms::ipguide_error_message,
        transform: transforms::ipguide_transform,
        raw_transform: None,
    },
    Provider {
        name: "ipinfo",
        group: ProviderGroup::Keyed,
        base_url: "https://ipinfo.io",
        path_and_query: |ip, key| match key {
            Some(key) => format!("/{ip}/json?token={key}"),
            None => format!("/{ip}/json"),
        },
        headers: no_headers,
        check_error: transforms::ipinfo_check_error,
        error_message: transforms::ipinfo_error_message,
        transform: transforms::ipinfo_transform,
        raw_transform: None,
    },
    Provider {
        name: "ipqs",
        group: ProviderGroup::Keyed,
        base_url: "https://www.ipqualityscore.com",
        path_and_query: |ip, key| {
            format!(
                "/api/json/ip/{}/{ip}?strictness=1&allow_public_access_points=true",
                key.unwrap_or_default()
            )
        },
        headers: no_headers,
        check_error: transforms::ipqs_check_error,
        error_message: transforms::ipqs_error_message,
        transform: transforms::ipqs_transform,
        raw_transform: None,
    },
    Provider {
        name: "abuseipdb",
        group: ProviderGroup::Keyed,
        base_url: "https://api.abuseipdb.com",
        path_and_query: |ip, _| {
            format!("/api/v2/check?ipAddress={ip}&maxAgeInDays={ABUSEIPDB_MAX_AGE_DAYS}")
        },
        headers: abuseipdb_headers,
        check_error: transforms::abuseipdb_check_error,
        error_message: transforms::abuseipdb_error_message,
        transform: transforms::abuseipdb_transform,
        raw_transform: Some(transforms::abuseipdb_raw),
    },
    Provider {
        name: "ip2location",
        group: ProviderGroup::Keyed,
        base_url: "https://api.ip2location.io",
        path_and_query: |ip, key| format!("/?key={}&ip={ip}", key.unwrap_or_default()),
        headers: no_headers,
        check_error: transforms::ip2location_check_error,
        error_message: transforms::ip2location_error_message,
        transform: transforms::ip2location_transform,
        raw_transform: None,
    },
    Provider {
        name: "cloudflare_asn",
        group: ProviderGroup::AsnDependent,
        base_url: "https://api.cloudflare.com",
        path_and_query: |asn, _| format!("/client/v4/radar/entities/asns/{asn}"),
        headers: cloudflare_headers,
        check_error: transforms::cloudflare_check_error,
        error_message: transforms::cloudflare_error_message,
        transform: transforms::cloudflare_transform,
        raw_transform: Some(transforms::cloudflare_raw),
    },
];

/// Enabled providers split into the three fetch groups.
pub struct ProviderPartition {
    /// Wave 1, no credentials.
    pub no_key: Vec<&'static Provider>,
    /// Wave 1, keyed.
    pub keyed: Vec<&'static Provider>,
    /// Wave 2, keyed, needs the ASN.
    pub asn_dependent: Vec<&'static Provider>,
}

impl ProviderPartition {
    /// Providers attempted in wave 1.
    pub fn wave1(&self) -> impl Iterator<Item = &&'static Provider> {
        self.no_key.iter().chain(self.keyed.iter())
    }
}

/// Partitions the enabled providers for a configuration.
pub fn partition_enabled(config: &Config) -> ProviderPartition {
    let mut partition = ProviderPartition {
        no_key: Vec::new(),
        keyed: Vec::new(),
        asn_dependent: Vec::new(),
    };
    for provider in PROVIDERS.iter().filter(|p| p.enabled(config)) {
        match provider.group {
            ProviderGroup::NoKey => partition.no_key.push(provider),
            ProviderGroup::Keyed => partition.keyed.push(provider),
            ProviderGroup::AsnDependent => partition.asn_dependent.push(provider),
        }
    }
    partition
}

/// Looks up a provider by name.
pub fn provider_by_name(name: &str) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_with_no_credentials() {
        let config = Config::default();
        let partition = partition_enabled(&config);
        assert_eq!(partition.no_key.len(), 1);
        assert_eq!(partition.no_key[0].name, "ipguide");
        assert!(partition.keyed.is_empty());
        assert!(partition.asn_dependent.is_empty());
    }

    #[test]
    fn test_partition_with_all_credentials() {
        let config = Config {
            ipqs_keys: vec!["k".into()],
            abuseipdb_keys: vec!["k".into()],
            ip2location_keys: vec!["k".into()],
            ipinfo_tokens: vec!["k".into()],
            cloudflare_tokens: vec!["k".into()],
            ..Default::default()
        };
        let partition = partition_enabled(&config);
        assert_eq!(partition.no_key.len(), 1);
        assert_eq!(partition.keyed.len(), 4);
        assert_eq!(partition.asn_dependent.len(), 1);
        assert_eq!(partition.wave1().count(), 5);
    }

    #[test]
    fn test_url_building_real_and_overridden() {
        let ipinfo = provider_by_name("ipinfo").unwrap();
        assert_eq!(
            ipinfo.url("8.8.8.8", Some("tok"), None),
            "https://ipinfo.io/8.8.8.8/json?token=tok"
        );
        assert_eq!(
            ipinfo.url("8.8.8.8", Some("tok"), Some("http://127.0.0.1:9999/")),
            "http://127.0.0.1:9999/ipinfo/8.8.8.8/json?token=tok"
        );
    }

    #[test]
    fn test_key_in_path_provider() {
        let ipqs = provider_by_name("ipqs").unwrap();
        let url = ipqs.url("1.2.3.4", Some("SECRET"), None);
        assert!(url.contains("/api/json/ip/SECRET/1.2.3.4"));
    }

    #[test]
    fn test_key_as_header_providers() {
        let abuse = provider_by_name("abuseipdb").unwrap();
        let headers = (abuse.headers)(Some("K1"));
        assert!(headers.contains(&("Key", "K1".to_string())));

        let cf = provider_by_name("cloudflare_asn").unwrap();
        let headers = (cf.headers)(Some("T1"));
        assert_eq!(headers, vec![("Authorization", "Bearer T1".to_string())]);
    }

    #[test]
    fn test_asn_dependent_url_uses_asn() {
        let cf = provider_by_name("cloudflare_asn").unwrap();
        assert_eq!(
            cf.url("15169", Some("tok"), None),
            "https://api.cloudflare.com/client/v4/radar/entities/asns/15169"
        );
    }

    #[test]
    fn test_provider_names_are_unique() {
        let mut names: Vec<_> = PROVIDERS.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), PROVIDERS.len());
    }
}
