use advisor_agents::Recommendation;
use advisor_catalog::MetadataFilter;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    pub query: String,

    /// Metadata filter in the `$eq` / `$in` / `$and` dialect
    #[serde(default)]
    pub filter: Option<Value>,

    #[serde(default)]
    pub top_k: Option<usize>,

    /// Single prose answer instead of JSON plus point-form text
    #[serde(default)]
    pub narrative: bool,
}

pub async fn recommend(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<Recommendation>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Missing query".to_string()));
    }

    if request.top_k == Some(0) {
        return Err(ApiError::BadRequest("topK must be at least 1".to_string()));
    }

    let filter = request
        .filter
        .as_ref()
        .filter(|v| !v.is_null())
        .map(MetadataFilter::parse)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let pipeline = state.pipeline.as_ref().ok_or_else(|| {
        ApiError::ServiceUnavailable(
            "Course catalog is not available. Run 'advisor catalog ingest' first.".to_string(),
        )
    })?;

    let recommendation = if request.narrative {
        pipeline.narrate(query, filter.as_ref(), request.top_k).await?
    } else {
        pipeline.recommend(query, filter.as_ref(), request.top_k).await?
    };

    Ok(Json(recommendation))
}
