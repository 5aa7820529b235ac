//! Transcribe route group, mounted under the `/transcribe` prefix.

use std::path::PathBuf;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info};

use crate::server::AppState;

/// Opaque failure body. Every failure collapses to this literal; the detail
/// goes to the log only.
pub const SERVER_ERROR: &str = "Server Error";

/// Routes mounted under the `/transcribe` prefix.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(transcribe_handler))
}

/// Request body for `POST /transcribe`.
#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    /// Local filesystem path of the audio file to transcribe.
    pub path: PathBuf,
}

/// `POST /transcribe`: audio file path in, UTF-8 transcript out.
///
/// The response is always 200 with either the transcript or the literal
/// `Server Error` body; there is no status-code differentiation and no retry.
async fn transcribe_handler(
    State(state): State<AppState>,
    payload: Result<Json<TranscribeRequest>, JsonRejection>,
) -> String {
    let Ok(Json(req)) = payload else {
        error!("transcribe request body did not parse");
        return SERVER_ERROR.into();
    };

    let Some(engine) = &state.engine else {
        error!("transcription engine not loaded");
        return SERVER_ERROR.into();
    };

    match engine.transcribe_file(&req.path).await {
        Ok(result) => {
            info!(
                "transcribed {} ({:.1}s of audio)",
                req.path.display(),
                result.duration_seconds
            );
            result.text
        }
        Err(e) => {
            error!(error = %e, path = %req.path.display(), "transcription failed");
            SERVER_ERROR.into()
        }
    }
}
