//! Resume upload.

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

const MISSING_FIELDS: &str = "Missing userId or resume";

/// Attach an uploaded resume to the user's conversation.
///
/// Expects multipart fields `userId` and `resume`. PDFs are converted to
/// text; anything else must be UTF-8 text.
pub async fn upload_resume(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?;

    let mut user_id = None;
    let mut resume = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid upload: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("userId") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid userId: {}", e)))?;
                user_id = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            Some("resume") => {
                let is_pdf = field.content_type() == Some("application/pdf")
                    || field
                        .file_name()
                        .is_some_and(|n| n.to_lowercase().ends_with(".pdf"));
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid resume: {}", e)))?;
                resume = Some((bytes.to_vec(), is_pdf));
            }
            other => tracing::debug!("Ignoring upload field {:?}", other),
        }
    }

    let (Some(user_id), Some((bytes, is_pdf))) = (user_id, resume) else {
        return Err(ApiError::BadRequest(MISSING_FIELDS.to_string()));
    };

    let text = extract_text(bytes, is_pdf).await?;

    let mut conversation = state
        .sessions
        .lock_current(&user_id, || state.intake.start_conversation())
        .await;
    state.intake.attach_resume(&mut conversation, &text)?;

    Ok(Json(json!({
        "message": "Resume uploaded.",
        "characters": text.chars().count(),
    })))
}

async fn extract_text(bytes: Vec<u8>, is_pdf: bool) -> Result<String, ApiError> {
    if !is_pdf {
        return String::from_utf8(bytes)
            .map_err(|_| ApiError::BadRequest("Resume must be a PDF or UTF-8 text".to_string()));
    }

    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(ApiError::internal)?
        .map_err(|e| {
            tracing::warn!("Failed to read PDF resume: {}", e);
            ApiError::BadRequest("Could not read text from the PDF resume".to_string())
        })
}
