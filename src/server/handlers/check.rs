//! Single-IP check handlers.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::aggregate_and_derive;
use crate::derive::DerivedRecord;
use crate::models::normalize_ip;
use crate::server::error::ApiError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    ip: Option<String>,
}

/// `GET /api/check?ip=<ip>`
///
/// With no `ip` parameter the caller's own address is checked. Domains are
/// rejected: domain resolution belongs to the resolver service, which
/// returns its own response shape.
pub async fn check_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<DerivedRecord>, ApiError> {
    let target = match query.ip {
        Some(raw) => normalize_ip(&raw).ok_or_else(|| {
            if raw.contains(|c: char| c.is_ascii_alphabetic()) {
                ApiError::bad_request(
                    "domains are not accepted here; resolve the domain first and pass an IP",
                )
            } else {
                ApiError::bad_request(format!("invalid IP address: {raw}"))
            }
        })?,
        None => peer.ip().to_string(),
    };

    Ok(Json(aggregate_and_derive(&state, &target, None).await))
}

#[derive(Debug, Deserialize)]
pub struct CheckIpDetailRequest {
    ip: String,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub result: DerivedRecord,
}

/// `POST /api/check-ip/detail {ip}`
pub async fn check_ip_detail_handler(
    State(state): State<AppState>,
    Json(request): Json<CheckIpDetailRequest>,
) -> Result<Json<DetailResponse>, ApiError> {
    let ip = normalize_ip(&request.ip)
        .ok_or_else(|| ApiError::bad_request(format!("invalid IP address: {}", request.ip)))?;
    let result = aggregate_and_derive(&state, &ip, None).await;
    Ok(Json(DetailResponse { result }))
}
