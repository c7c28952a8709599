//! Batch streaming scheduler.
//!
//! Deduplicates the requested IPs, runs one aggregation task per unique IP,
//! and emits each derived record over a bounded channel as it completes.
//! Completion order is the only ordering guarantee. A dropped receiver (the
//! client went away) stops emissions; in-flight aggregations still run to
//! completion so their cache writes land.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::aggregate::Engine;
use crate::config::STREAM_CHANNEL_CAPACITY;
use crate::derive::{build_record, DerivedRecord};
use crate::models::CfData;

/// Stream progress: unique IPs completed out of unique IPs requested.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Progress {
    /// Unique IPs finished so far.
    pub completed: usize,
    /// Unique IPs in the batch.
    pub total: usize,
}

/// Events emitted over the batch stream, in SSE order.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// One IP finished aggregating.
    Result {
        ip: String,
        result: Box<DerivedRecord>,
        progress: Progress,
    },
    /// Every unique IP finished.
    Done { progress: Progress },
    /// A per-item failure (`ITEM_FAILED`) or a stream abort (`STREAM_ERROR`).
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        ip: Option<String>,
        code: String,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        progress: Option<Progress>,
    },
}

/// One row of a batch request.
#[derive(Clone, Debug)]
pub struct BatchItem {
    /// Target IP.
    pub ip: String,
    /// Optional edge snapshot for this row (ASN hint + edge metrics).
    pub cf_data: Option<CfData>,
}

/// Starts a batch run and returns the event receiver.
///
/// Later duplicate IPs collapse onto the first occurrence (downstream can
/// fan one result back out to its input rows). Cancelling `cancel` stops
/// emissions without aborting in-flight aggregations.
pub fn run_batch(
    engine: Arc<Engine>,
    items: Vec<BatchItem>,
    cancel: CancellationToken,
) -> mpsc::Receiver<StreamEvent> {
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        if let Err(e) = drive_batch(engine, items, &tx, cancel).await {
            log::warn!("batch stream aborted: {e}");
            let _ = tx
                .send(StreamEvent::Error {
                    ip: None,
                    code: "STREAM_ERROR".to_string(),
                    error: e.to_string(),
                    progress: None,
                })
                .await;
        }
    });
    rx
}

async fn drive_batch(
    engine: Arc<Engine>,
    items: Vec<BatchItem>,
    tx: &mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    // Dedup by IP, first occurrence wins (it carries the edge snapshot).
    let mut seen = HashSet::new();
    let unique: Vec<BatchItem> = items
        .into_iter()
        .filter(|item| seen.insert(item.ip.clone()))
        .collect();

    let total = unique.len();
    let mut completed = 0usize;

    let mut tasks = FuturesUnordered::new();
    for item in unique {
        let engine = Arc::clone(&engine);
        let ip = item.ip.clone();
        let handle = tokio::spawn(async move {
            let asn_hint = item.cf_data.as_ref().and_then(|cf| cf.asn).map(|asn| asn.to_string());
            let bundle = engine.check_ip(&item.ip, asn_hint).await;
            let timestamp = engine.clock().now_millis();
            build_record(&bundle, item.cf_data.as_ref(), timestamp)
        });
        tasks.push(async move { (ip, handle.await) });
    }

    loop {
        let next = tokio::select! {
            next = tasks.next() => next,
            _ = cancel.cancelled() => {
                log::debug!("batch stream cancelled with {} of {} done", completed, total);
                return Ok(());
            }
        };
        let Some((ip, joined)) = next else {
            break;
        };

        completed += 1;
        let progress = Progress { completed, total };
        let event = match joined {
            Ok(record) => StreamEvent::Result {
                ip,
                result: Box::new(record),
                progress,
            },
            Err(join_error) => {
                log::warn!("aggregation task for {ip} failed: {join_error}");
                StreamEvent::Error {
                    ip: Some(ip),
                    code: "ITEM_FAILED".to_string(),
                    error: join_error.to_string(),
                    progress: Some(progress),
                }
            }
        };
        if tx.send(event).await.is_err() {
            // Receiver is gone; remaining tasks finish on their own for the
            // cache writes, but nobody is listening.
            log::debug!("batch stream receiver dropped, suppressing emissions");
            return Ok(());
        }
    }

    let _ = tx
        .send(StreamEvent::Done {
            progress: Progress {
                completed: total,
                total,
            },
        })
        .await;
    Ok(())
}
