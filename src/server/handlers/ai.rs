//! LLM analysis handler.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::cache::Cache;
use crate::derive::DerivedRecord;
use crate::llm::{is_cacheable_analysis, AiAnalysis};
use crate::models::normalize_ip;
use crate::server::error::ApiError;
use crate::server::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AiAnalysisRequest {
    pub ip: String,
    /// The derived record the client already holds.
    pub data: DerivedRecord,
}

/// `POST /api/ai-analysis {ip, data}`
///
/// 503 when no LLM is configured. Successful analyses are cached per IP;
/// failure sentinels are returned but never cached.
pub async fn ai_analysis_handler(
    State(state): State<AppState>,
    Json(request): Json<AiAnalysisRequest>,
) -> Result<Json<AiAnalysis>, ApiError> {
    let Some(llm) = state.llm.as_ref() else {
        return Err(ApiError::unavailable("AI analysis is not configured"));
    };
    let ip = normalize_ip(&request.ip)
        .ok_or_else(|| ApiError::bad_request(format!("invalid IP address: {}", request.ip)))?;

    let cache_key = Cache::ai_key(&ip);
    if let Some(reasoning) = state.engine.cache().get::<String>(&cache_key).await {
        log::debug!("AI analysis cache hit for {ip}");
        return Ok(Json(AiAnalysis {
            reasoning,
            debug: None,
        }));
    }

    let analysis = llm.analyze(&ip, &request.data).await;

    if is_cacheable_analysis(&analysis.reasoning) {
        state
            .engine
            .cache()
            .put(&cache_key, &analysis.reasoning, state.engine.config().cache_ttl)
            .await;
    }

    Ok(Json(analysis))
}
