//! Exit-flavored check handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::aggregate_and_derive;
use crate::config::MAX_BATCH_ITEMS;
use crate::derive::DerivedRecord;
use crate::exits::{prepare_exits, ExitInput, ExitType, PreparedExits};
use crate::models::{normalize_ip, CfData};
use crate::server::error::ApiError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExitsRequest {
    pub exits: Vec<ExitInput>,
}

/// `POST /api/check-exits/prepare {exits}` — pure, no I/O.
pub async fn prepare_exits_handler(
    Json(request): Json<ExitsRequest>,
) -> Result<Json<PreparedExits>, ApiError> {
    if request.exits.len() > MAX_BATCH_ITEMS {
        return Err(ApiError::bad_request(format!(
            "too many exits: {} (max {MAX_BATCH_ITEMS})",
            request.exits.len()
        )));
    }
    Ok(Json(prepare_exits(&request.exits)))
}

/// One entry of the `check-exits` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitResult {
    pub exit_type: ExitType,
    pub ip: String,
    pub result: DerivedRecord,
}

#[derive(Debug, Serialize)]
pub struct ExitsResponse {
    pub results: Vec<ExitResult>,
}

/// `POST /api/check-exits {exits}` — aggregate every unique exit IP and
/// return the results together.
pub async fn check_exits_handler(
    State(state): State<AppState>,
    Json(request): Json<ExitsRequest>,
) -> Result<Json<ExitsResponse>, ApiError> {
    if request.exits.len() > MAX_BATCH_ITEMS {
        return Err(ApiError::bad_request(format!(
            "too many exits: {} (max {MAX_BATCH_ITEMS})",
            request.exits.len()
        )));
    }
    let prepared = prepare_exits(&request.exits);

    let futures = prepared.ip_list.iter().map(|row| {
        let state = &state;
        async move {
            let result = aggregate_and_derive(state, &row.ip, row.cf_data.as_ref()).await;
            ExitResult {
                exit_type: row.exit_type,
                ip: row.ip.clone(),
                result,
            }
        }
    });
    let results = futures::future::join_all(futures).await;

    Ok(Json(ExitsResponse { results }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitDetailRequest {
    pub exit_type: ExitType,
    pub cf_data: Option<CfData>,
}

#[derive(Debug, Serialize)]
pub struct ExitDetailResponse {
    pub result: DerivedRecord,
}

/// `POST /api/check-exits/detail {exitType, cfData}`
pub async fn exit_detail_handler(
    State(state): State<AppState>,
    Json(request): Json<ExitDetailRequest>,
) -> Result<Json<ExitDetailResponse>, ApiError> {
    let ip = request
        .cf_data
        .as_ref()
        .and_then(|cf| cf.ip.as_deref())
        .and_then(normalize_ip)
        .ok_or_else(|| {
            ApiError::bad_request(format!(
                "exit {} has no valid IP in its edge snapshot",
                request.exit_type
            ))
        })?;
    let result = aggregate_and_derive(&state, &ip, request.cf_data.as_ref()).await;
    Ok(Json(ExitDetailResponse { result }))
}
