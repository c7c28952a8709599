//! Request handlers for the API surface.

mod ai;
mod check;
mod config;
mod exits;
mod health;
mod stream;

pub use ai::ai_analysis_handler;
pub use check::{check_handler, check_ip_detail_handler};
pub use config::config_handler;
pub use exits::{check_exits_handler, exit_detail_handler, prepare_exits_handler};
pub use health::{health_handler, health_live_handler, health_ready_handler};
pub use stream::{check_exits_batch_stream_handler, check_ip_batch_stream_handler};

use crate::derive::{build_record, DerivedRecord};
use crate::models::CfData;
use crate::server::state::AppState;

/// Aggregates one IP and derives the user-visible record.
pub(crate) async fn aggregate_and_derive(
    state: &AppState,
    ip: &str,
    cf_data: Option<&CfData>,
) -> DerivedRecord {
    let asn_hint = cf_data.and_then(|cf| cf.asn).map(|asn| asn.to_string());
    let bundle = state.engine.check_ip(ip, asn_hint).await;
    let timestamp = state.engine.clock().now_millis();
    build_record(&bundle, cf_data, timestamp)
}
