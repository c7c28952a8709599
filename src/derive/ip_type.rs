//! IP usage-type normalization and voting.
//!
//! Providers describe usage type in incompatible vocabularies ("Data
//! Center", "DCH", "Fixed Line ISP", a bare hosting flag). Each raw string
//! is normalized into a fixed category, then the categories vote; ties go to
//! the earliest candidate in the pinned source order.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Normalized usage categories.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IpType {
    /// Consumer ISP connection.
    Residential,
    /// Cellular carrier.
    Mobile,
    /// Hosting, cloud, CDN, or other server space.
    Datacenter,
    /// Business connection.
    Commercial,
    /// University, school, or library.
    Education,
    /// Government or military.
    Government,
    /// No provider said anything usable.
    Unknown,
}

/// One provider's contribution to the type vote.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSourceDetail {
    /// Display label of the contributing provider.
    pub source: String,
    /// The provider's raw type string.
    pub raw_type: String,
    /// What it normalized to.
    pub normalized_type: IpType,
}

struct CategoryPatterns {
    category: IpType,
    exact: &'static [&'static str],
    includes: &'static [&'static str],
}

/// Matching is ordered: hosting-ish labels often embed other words
/// ("Data Center/Web Hosting/Transit"), so datacenter is checked first.
static PATTERNS: &[CategoryPatterns] = &[
    CategoryPatterns {
        category: IpType::Datacenter,
        exact: &["DCH", "DAT", "CDN", "SES", "HOSTING"],
        includes: &["DATA CENTER", "DATACENTER", "HOSTING", "CLOUD", "SERVER"],
    },
    CategoryPatterns {
        category: IpType::Mobile,
        exact: &["MOB"],
        includes: &["MOBILE", "CELLULAR", "WIRELESS"],
    },
    CategoryPatterns {
        category: IpType::Residential,
        exact: &["ISP", "RES"],
        includes: &["RESIDENTIAL", "FIXED LINE", "BROADBAND", "DSL", "CABLE", "FTTH"],
    },
    CategoryPatterns {
        category: IpType::Education,
        // "library" folds into education
        exact: &["EDU", "LIB"],
        includes: &["EDUCATION", "UNIVERSITY", "COLLEGE", "SCHOOL", "LIBRARY"],
    },
    CategoryPatterns {
        category: IpType::Government,
        exact: &["GOV", "MIL"],
        includes: &["GOVERNMENT", "MILITARY"],
    },
    CategoryPatterns {
        category: IpType::Commercial,
        exact: &["COM", "ORG"],
        includes: &["COMMERCIAL", "CORPORATE", "BUSINESS"],
    },
];

/// Normalizes a raw provider type string into a category.
pub fn normalize_type(raw: &str) -> IpType {
    let upper = raw.trim().to_uppercase();
    if upper.is_empty() {
        return IpType::Unknown;
    }
    for patterns in PATTERNS {
        if patterns.exact.iter().any(|p| upper == *p) {
            return patterns.category;
        }
        if patterns.includes.iter().any(|p| upper.contains(p)) {
            return patterns.category;
        }
    }
    IpType::Unknown
}

/// Tallies the candidates and returns the winning category plus the raw
/// label of the first candidate that voted for it.
///
/// `unknown` never votes. Ties break toward the candidate reached first,
/// which is why callers build the candidate list in the pinned order
/// IPQS → AbuseIPDB → IP2Location → ipinfo-hosting.
pub fn vote(candidates: &[TypeSourceDetail]) -> (IpType, Option<String>) {
    let mut tallies: Vec<(IpType, usize, usize)> = Vec::new(); // (category, count, first_index)
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.normalized_type == IpType::Unknown {
            continue;
        }
        match tallies
            .iter_mut()
            .find(|(category, _, _)| *category == candidate.normalized_type)
        {
            Some((_, count, _)) => *count += 1,
            None => tallies.push((candidate.normalized_type, 1, index)),
        }
    }

    let Some((winner, _, first_index)) = tallies
        .iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
        .copied()
    else {
        return (IpType::Unknown, None);
    };
    let raw_label = candidates.get(first_index).map(|c| c.raw_type.clone());
    (winner, raw_label)
}
