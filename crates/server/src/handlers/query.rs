//! Intake conversation endpoints.

use advisor_agents::TurnOutcome;
use advisor_catalog::CourseRecord;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::{ApiError, GENERIC_ERROR};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub response: String,
    pub conversation_ended: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refined_query: Option<String>,

    /// Text recommendation produced when the conversation ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<CourseRecord>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// One intake turn.
///
/// When the student ends the conversation the session is dropped and the
/// refined query runs through the recommendation pipeline.
pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let (Some(user_id), Some(message)) = (non_empty(request.user_id), non_empty(request.message))
    else {
        return Err(ApiError::BadRequest("Missing userId or message".to_string()));
    };

    let outcome = {
        let mut conversation = state
            .sessions
            .lock_current(&user_id, || state.intake.start_conversation())
            .await;
        let outcome = state.intake.respond(&mut conversation, &message).await;
        // Removed under the lock so a waiting turn moves to a fresh session.
        if outcome.as_ref().is_ok_and(TurnOutcome::is_finished) {
            state.sessions.remove(&user_id).await;
        }
        outcome
    };

    let outcome = outcome.map_err(|e| {
        tracing::error!("Intake turn failed for {}: {}", user_id, e);
        ApiError::Internal(GENERIC_ERROR.to_string())
    })?;

    let (reply, refined_query) = match outcome {
        TurnOutcome::Continue { reply } => {
            return Ok(Json(QueryResponse {
                response: reply,
                conversation_ended: false,
                refined_query: None,
                final_output: None,
                courses: None,
            }));
        }
        TurnOutcome::Finished {
            reply,
            refined_query,
        } => (reply, refined_query),
    };

    let (final_output, courses) = match &state.pipeline {
        Some(pipeline) => match pipeline.recommend(&refined_query, None, None).await {
            Ok(recommendation) => (Some(recommendation.text), Some(recommendation.courses)),
            Err(e) => {
                tracing::warn!("Recommendation pipeline failed: {}", e);
                (None, None)
            }
        },
        None => (None, None),
    };

    Ok(Json(QueryResponse {
        response: reply,
        conversation_ended: true,
        refined_query: Some(refined_query),
        final_output,
        courses,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Forget a user's conversation. Unknown users are fine.
pub async fn reset(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ResetRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    if let Some(user_id) = non_empty(request.user_id) {
        state.sessions.remove(&user_id).await;
    }

    Ok(Json(json!({ "message": "Conversation reset." })))
}
