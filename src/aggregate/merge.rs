//! Merged-record overlay and shared-key resolution.

use crate::models::{get_str, MergedMap};

/// Shallow-overlays `layer` onto `base`; later writers win.
///
/// Keys are namespaced per source, so collisions only happen on the
/// intentionally shared keys (`asn`, `country_code`, ...) where
/// last-writer-wins is the documented behavior.
pub fn overlay(base: &mut MergedMap, layer: &MergedMap) {
    for (key, value) in layer {
        base.insert(key.clone(), value.clone());
    }
}

/// Best ASN candidate from a merged map: `asn`, then `ASN`, then `as`,
/// reduced to digits.
pub fn resolve_asn(map: &MergedMap) -> Option<String> {
    for key in ["asn", "ASN", "as"] {
        if let Some(raw) = get_str(map, key) {
            let text = raw
                .strip_prefix("AS")
                .or_else(|| raw.strip_prefix("as"))
                .unwrap_or(raw);
            let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
            if !digits.is_empty() {
                return Some(digits);
            }
        } else if let Some(number) = map.get(key).and_then(serde_json::Value::as_i64) {
            return Some(number.to_string());
        }
    }
    None
}
