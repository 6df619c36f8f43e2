use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::error;

use crate::AppState;
use crate::backend::TagsResponse;

pub async fn list_models(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let response = state.backend.tags().await.map_err(|err| {
        error!("error connecting to Ollama tags API: {err}");
        (
            StatusCode::BAD_GATEWAY,
            format!(
                "Could not connect to Ollama to list models. Please ensure Ollama is running on {}.",
                state.backend.base_url()
            ),
        )
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!("Ollama tags API returned status {status}: {body}");
        return Err((
            status,
            format!(
                "Ollama API error fetching models: status {}, message: {}",
                status.as_u16(),
                body.trim()
            ),
        ));
    }

    let tags: TagsResponse = response.json().await.map_err(|err| {
        error!("error decoding Ollama tags response: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error parsing Ollama models response.".to_string(),
        )
    })?;

    Ok((StatusCode::OK, Json(tags)))
}
