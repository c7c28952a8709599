//! Batch streaming handlers (Server-Sent Events).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::exits::ExitsRequest;
use crate::config::MAX_BATCH_ITEMS;
use crate::exits::prepare_exits;
use crate::models::normalize_ip;
use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::stream::{run_batch, BatchItem, StreamEvent};

#[derive(Debug, Deserialize)]
pub struct IpListRequest {
    pub ips: Vec<IpListEntry>,
}

/// One batch entry. The UI also sends a `type` hint per entry; unknown
/// fields are ignored on deserialization.
#[derive(Debug, Deserialize)]
pub struct IpListEntry {
    pub ip: String,
}

/// `POST /api/check-ip/batch-stream {ips}` — SSE stream of
/// `result | done | error` events in completion order.
pub async fn check_ip_batch_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<IpListRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if request.ips.len() > MAX_BATCH_ITEMS {
        return Err(ApiError::bad_request(format!(
            "too many IPs: {} (max {MAX_BATCH_ITEMS})",
            request.ips.len()
        )));
    }
    let items: Vec<BatchItem> = request
        .ips
        .iter()
        .filter_map(|entry| {
            normalize_ip(&entry.ip).map(|ip| BatchItem { ip, cf_data: None })
        })
        .collect();
    if items.is_empty() {
        return Err(ApiError::bad_request("no valid IP in the request"));
    }

    Ok(start_stream(&state, items))
}

/// `POST /api/check-exits/batch-stream {exits}` — same event stream over
/// prepared exit rows.
pub async fn check_exits_batch_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ExitsRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if request.exits.len() > MAX_BATCH_ITEMS {
        return Err(ApiError::bad_request(format!(
            "too many exits: {} (max {MAX_BATCH_ITEMS})",
            request.exits.len()
        )));
    }
    let prepared = prepare_exits(&request.exits);
    if prepared.ip_list.is_empty() {
        return Err(ApiError::bad_request("no valid exit IP in the request"));
    }
    let items: Vec<BatchItem> = prepared
        .ip_list
        .into_iter()
        .map(|row| BatchItem {
            ip: row.ip,
            cf_data: row.cf_data,
        })
        .collect();

    Ok(start_stream(&state, items))
}

fn start_stream(
    state: &AppState,
    items: Vec<BatchItem>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // The token is never cancelled from here; dropping the SSE body drops
    // the receiver, which stops emissions on the scheduler side.
    let rx = run_batch(Arc::clone(&state.engine), items, CancellationToken::new());
    Sse::new(event_stream(rx)).keep_alive(KeepAlive::default())
}

fn event_stream(
    rx: mpsc::Receiver<StreamEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        let sse_event = Event::default()
            .json_data(&event)
            .unwrap_or_else(|e| Event::default().comment(format!("serialization error: {e}")));
        Some((Ok(sse_event), rx))
    })
}
