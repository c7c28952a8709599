//! Exit-row preparation.
//!
//! An "exit" is one outbound network path a client can use (plain IPv4/v6,
//! WARP, HE tunnel), each arriving with its own edge snapshot. Preparation
//! is pure: validate the snapshot IPs, order the rows canonically, and
//! collapse duplicate IPs so the aggregator runs once per address.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::models::{normalize_ip, CfData};

/// Known exit paths, in canonical order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExitType {
    /// Plain IPv4.
    Ipv4,
    /// Plain IPv6.
    Ipv6,
    /// WARP over IPv4.
    WarpV4,
    /// WARP over IPv6.
    WarpV6,
    /// Hurricane Electric IPv6 tunnel.
    HeV6,
}

impl ExitType {
    /// Canonical sort rank: `ipv4 < ipv6 < warp_v4 < warp_v6 < he_v6`.
    pub fn order(self) -> u8 {
        match self {
            ExitType::Ipv4 => 1,
            ExitType::Ipv6 => 2,
            ExitType::WarpV4 => 3,
            ExitType::WarpV6 => 4,
            ExitType::HeV6 => 5,
        }
    }
}

/// One exit row as submitted by the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitInput {
    /// Which exit path this row describes.
    pub exit_type: ExitType,
    /// The edge snapshot for the path; its `ip` field is the target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_data: Option<CfData>,
}

/// One prepared row: a validated IP with its originating exit.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedIp {
    /// Validated target IP.
    pub ip: String,
    /// Exit the IP came from.
    pub exit_type: ExitType,
    /// ASN hint from the edge snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    /// The originating edge snapshot, passed through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cf_data: Option<CfData>,
    /// Canonical rank of the exit type, carried for UI sorting.
    pub order: u8,
}

/// Output of [`prepare_exits`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedExits {
    /// Ordered, deduplicated rows.
    pub ip_list: Vec<PreparedIp>,
    /// Number of unique IPs in `ip_list`.
    pub unique_ip_count: usize,
}

/// Validates, orders, and deduplicates exit rows. Pure; no I/O.
///
/// Rows without a parseable IP in their snapshot are dropped. Ordering is by
/// exit rank, ties by exit-type name ascending; duplicate IPs keep the
/// first row after ordering. Idempotent: preparing the output again yields
/// the same list.
pub fn prepare_exits(exits: &[ExitInput]) -> PreparedExits {
    let mut rows: Vec<PreparedIp> = exits
        .iter()
        .filter_map(|exit| {
            let cf_data = exit.cf_data.as_ref()?;
            let ip = normalize_ip(cf_data.ip.as_deref()?)?;
            Some(PreparedIp {
                ip,
                exit_type: exit.exit_type,
                asn: cf_data.asn,
                cf_data: Some(cf_data.clone()),
                order: exit.exit_type.order(),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.order
            .cmp(&b.order)
            .then_with(|| a.exit_type.to_string().cmp(&b.exit_type.to_string()))
    });

    let mut seen = std::collections::HashSet::new();
    rows.retain(|row| seen.insert(row.ip.clone()));

    PreparedExits {
        unique_ip_count: rows.len(),
        ip_list: rows,
    }
}
