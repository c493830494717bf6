//! # Push API
//!
//! Multipart upload of one APK. The `file` field is streamed straight
//! into the artifact store; optional `message` and `version_tag` text
//! fields may appear before or after it.

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use heleus_core::wire::{PushResponse, PUSH_FILE_FIELD, PUSH_MESSAGE_FIELD, PUSH_TAG_FIELD};

use crate::error::AppError;
use crate::state::AppState;

/// Multipart framing overhead allowed on top of the artifact ceiling.
const MULTIPART_SLACK: u64 = 64 * 1024;

/// Build the push router. The request body limit tracks the artifact ceiling.
pub fn router(max_artifact_bytes: u64) -> Router<AppState> {
    let limit = usize::try_from(max_artifact_bytes.saturating_add(MULTIPART_SLACK))
        .unwrap_or(usize::MAX);
    Router::new().route(
        "/api/v1/push",
        post(push).layer(DefaultBodyLimit::max(limit)),
    )
}

/// POST /api/v1/push — Upload an artifact for the application named by its filename.
async fn push(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PushResponse>, AppError> {
    let mut upload = None;
    let mut message = None;
    let mut version_tag = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(PUSH_FILE_FIELD) => {
                if upload.is_some() {
                    return Err(AppError::BadRequest(format!(
                        "more than one '{PUSH_FILE_FIELD}' field"
                    )));
                }
                let filename = field
                    .file_name()
                    .map(str::to_owned)
                    .ok_or_else(|| AppError::InvalidArtifact("upload has no filename".into()))?;
                let mut pending = state.repository.begin_push(&filename).await?;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    pending.write(&chunk).await?;
                }
                upload = Some(pending);
            }
            Some(PUSH_MESSAGE_FIELD) => {
                message = non_empty(field.text().await.map_err(multipart_error)?);
            }
            Some(PUSH_TAG_FIELD) => {
                version_tag = non_empty(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| {
        AppError::BadRequest(format!("missing multipart field '{PUSH_FILE_FIELD}'"))
    })?;
    let response = state
        .repository
        .complete_push(upload, message, version_tag)
        .await?;
    Ok(Json(response))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::InvalidArtifact("artifact exceeds the configured size ceiling".into())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_metadata_is_dropped() {
        assert_eq!(non_empty("  ".into()), None);
        assert_eq!(non_empty(" v1.2 ".into()).as_deref(), Some("v1.2"));
    }
}
