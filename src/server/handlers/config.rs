//! Public configuration handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::state::AppState;

/// `GET /api/config` response: host hints plus UI timeouts.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub hosts: HostsResponse,
    pub timeouts: TimeoutsResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct HostsResponse {
    pub ipv4_host: Option<String>,
    pub ipv6_host: Option<String>,
    pub cfv4_host: Option<String>,
    pub cfv6_host: Option<String>,
    pub he_host: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TimeoutsResponse {
    /// Frontend request timeout in ms.
    pub frontend: u64,
    /// Connectivity-probe timeout in ms.
    pub connectivity: u64,
}

/// `GET /api/config`
pub async fn config_handler(State(state): State<AppState>) -> Json<ConfigResponse> {
    let config = state.engine.config();
    Json(ConfigResponse {
        hosts: HostsResponse {
            ipv4_host: config.hosts.ipv4_host.clone(),
            ipv6_host: config.hosts.ipv6_host.clone(),
            cfv4_host: config.hosts.cfv4_host.clone(),
            cfv6_host: config.hosts.cfv6_host.clone(),
            he_host: config.hosts.he_host.clone(),
        },
        timeouts: TimeoutsResponse {
            frontend: config.frontend_timeout_ms,
            connectivity: config.connectivity_timeout_ms,
        },
    })
}
