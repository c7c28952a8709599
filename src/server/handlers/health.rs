//! Health endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::providers::{partition_enabled, PROVIDERS};
use crate::server::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy | degraded | unhealthy`
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub version: &'static str,
    pub dependencies: Dependencies,
}

#[derive(Debug, Serialize)]
pub struct Dependencies {
    pub cache: DependencyStatus,
    pub providers: ProvidersStatus,
    pub llm: DependencyStatus,
}

#[derive(Debug, Serialize)]
pub struct DependencyStatus {
    /// `ok | error | unavailable`
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProvidersStatus {
    pub status: &'static str,
    pub enabled: usize,
    pub total: usize,
    /// Keyed providers whose entire pool is currently benched.
    pub exhausted_pools: Vec<String>,
}

/// `GET /api/health`
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.engine.config();
    let partition = partition_enabled(config);
    let enabled =
        partition.no_key.len() + partition.keyed.len() + partition.asn_dependent.len();

    let exhausted_pools: Vec<String> = PROVIDERS
        .iter()
        .filter(|p| p.needs_key() && p.enabled(config))
        .filter(|p| {
            state
                .engine
                .pool(p.name)
                .map(|pool| pool.healthy_count() == 0)
                .unwrap_or(false)
        })
        .map(|p| p.name.to_string())
        .collect();

    let providers_status = if enabled == 0 { "error" } else { "ok" };
    let llm_status = if state.llm.is_some() { "ok" } else { "unavailable" };

    let status = if providers_status == "error" {
        "unhealthy"
    } else if llm_status != "ok" || !exhausted_pools.is_empty() {
        "degraded"
    } else {
        "healthy"
    };

    Json(HealthResponse {
        status,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
        dependencies: Dependencies {
            cache: DependencyStatus {
                status: "ok",
                detail: Some(format!("{} entries", state.engine.cache().entry_count())),
            },
            providers: ProvidersStatus {
                status: providers_status,
                enabled,
                total: PROVIDERS.len(),
                exhausted_pools,
            },
            llm: DependencyStatus {
                status: llm_status,
                detail: None,
            },
        },
    })
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

/// `GET /api/health/live`
pub async fn health_live_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "ok" })
}

/// `GET /api/health/ready`
pub async fn health_ready_handler(State(_state): State<AppState>) -> Json<LivenessResponse> {
    // The engine is constructed before the listener binds; reaching this
    // handler means the service can take traffic.
    Json(LivenessResponse { status: "ok" })
}
