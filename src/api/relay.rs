use std::convert::Infallible;

use async_stream::stream;
use axum::{
    body::Bytes,
    extract::State,
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::backend::{ChatMessage, ChatRequest, GenerateRequest, OllamaBackend, StreamChunk};

/// Terminal sentinel sent to the client once the backend reports completion.
pub const DONE_EVENT: &str = "[DONE]";

/// Unified request body for `POST /relay-action`. The `actionType` tag
/// selects the variant, so each action only carries the fields it needs.
#[derive(Debug, Deserialize)]
#[serde(tag = "actionType", rename_all = "lowercase")]
pub enum ActionRequest {
    Generate {
        model: String,
        prompt: String,
    },
    Chat {
        model: String,
        messages: Vec<ChatMessage>,
    },
    Pull {
        model: String,
    },
    Delete {
        model: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayMode {
    Generate,
    Chat,
}

impl RelayMode {
    fn as_str(self) -> &'static str {
        match self {
            RelayMode::Generate => "generate",
            RelayMode::Chat => "chat",
        }
    }
}

pub async fn relay_action(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    let request: ActionRequest = serde_json::from_slice(&body).map_err(|err| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid request payload: {err}"),
        )
    })?;

    let request_id = Uuid::new_v4();

    match request {
        ActionRequest::Generate { model, prompt } => {
            info!(%request_id, %model, "relaying generate request");
            let sent = state
                .backend
                .generate(&GenerateRequest {
                    model,
                    prompt,
                    stream: true,
                })
                .await;
            open_event_stream(&state.backend, RelayMode::Generate, request_id, sent).await
        }
        ActionRequest::Chat { model, messages } => {
            info!(%request_id, %model, messages = messages.len(), "relaying chat request");
            let sent = state
                .backend
                .chat(&ChatRequest {
                    model,
                    messages,
                    stream: true,
                })
                .await;
            open_event_stream(&state.backend, RelayMode::Chat, request_id, sent).await
        }
        ActionRequest::Pull { model } => {
            info!(%request_id, %model, "relaying pull request");
            let sent = state.backend.pull(&model).await;
            relay_model_action(&state.backend, "pulling", sent).await
        }
        ActionRequest::Delete { model } => {
            info!(%request_id, %model, "relaying delete request");
            let sent = state.backend.delete(&model).await;
            relay_model_action(&state.backend, "deleting", sent).await
        }
    }
}

/// Connectivity and backend-status failures are reported here, before the
/// response switches to event-stream mode; once streaming starts the only
/// in-band signal left is the terminal event.
async fn open_event_stream(
    backend: &OllamaBackend,
    mode: RelayMode,
    request_id: Uuid,
    sent: reqwest::Result<reqwest::Response>,
) -> Result<Response, (StatusCode, String)> {
    let response = sent.map_err(|err| {
        error!(%request_id, "error connecting to Ollama {} API: {err}", mode.as_str());
        (
            StatusCode::BAD_GATEWAY,
            format!(
                "Could not connect to Ollama. Please ensure Ollama is running on {}. {err}",
                backend.base_url()
            ),
        )
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(%request_id, "Ollama {} API returned status {status}: {body}", mode.as_str());
        return Err((
            status,
            format!(
                "Ollama API error: status {}, message: {}",
                status.as_u16(),
                body.trim()
            ),
        ));
    }

    let stream = chunk_events(mode, request_id, response);

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(stream).keep_alive(KeepAlive::default()),
    )
        .into_response())
}

/// Forwards the backend's NDJSON lines as SSE events in arrival order. If the
/// client goes away the stream is dropped, which drops `response` and closes
/// the backend connection.
fn chunk_events(
    mode: RelayMode,
    request_id: Uuid,
    response: reqwest::Response,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream! {
        let mut byte_stream = response.bytes_stream();
        let mut buffer = Vec::new();

        while let Some(next) = byte_stream.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(err) => {
                    warn!(%request_id, "error reading Ollama {} stream: {err}", mode.as_str());
                    return;
                }
            };

            buffer.extend_from_slice(&bytes);

            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line = String::from_utf8_lossy(&buffer[..pos])
                    .trim_end_matches('\r')
                    .to_string();
                buffer.drain(..=pos);

                match assess_line(mode, request_id, &line) {
                    LineDisposition::Skip => {}
                    LineDisposition::Forward { done } => {
                        yield Ok(Event::default().data(&line));
                        if done {
                            yield Ok(Event::default().data(DONE_EVENT));
                            return;
                        }
                    }
                    LineDisposition::Complete => {
                        yield Ok(Event::default().data(DONE_EVENT));
                        return;
                    }
                }
            }
        }

        // The backend closed without a trailing line terminator; give whatever
        // is buffered a final parse before ending the stream.
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer)
                .trim_end_matches('\r')
                .to_string();

            match assess_line(mode, request_id, &line) {
                LineDisposition::Skip => {}
                LineDisposition::Forward { done } => {
                    yield Ok(Event::default().data(&line));
                    if done {
                        yield Ok(Event::default().data(DONE_EVENT));
                        return;
                    }
                }
                LineDisposition::Complete => {
                    yield Ok(Event::default().data(DONE_EVENT));
                    return;
                }
            }
        }

        warn!(%request_id, "Ollama {} stream ended without a completion flag", mode.as_str());
    }
}

#[derive(Debug, PartialEq, Eq)]
enum LineDisposition {
    /// Blank, malformed or empty-output line: drop it, keep streaming.
    Skip,
    /// Relay the raw line to the client, then terminate if `done` is set.
    Forward { done: bool },
    /// Nothing to relay, but the backend reported completion.
    Complete,
}

fn assess_line(mode: RelayMode, request_id: Uuid, line: &str) -> LineDisposition {
    if line.trim().is_empty() {
        return LineDisposition::Skip;
    }

    let chunk: StreamChunk = match serde_json::from_str(line) {
        Ok(chunk) => chunk,
        Err(err) => {
            warn!(%request_id, "skipping malformed Ollama {} chunk: {err}, line: {line}", mode.as_str());
            return LineDisposition::Skip;
        }
    };

    let has_output = match mode {
        RelayMode::Generate => chunk.response.as_deref().is_some_and(|text| !text.is_empty()),
        RelayMode::Chat => chunk
            .message
            .as_ref()
            .is_some_and(|message| !message.content.is_empty()),
    };

    match (has_output, chunk.done) {
        (true, done) => LineDisposition::Forward { done },
        (false, true) => LineDisposition::Complete,
        (false, false) => LineDisposition::Skip,
    }
}

async fn relay_model_action(
    backend: &OllamaBackend,
    verb: &str,
    sent: reqwest::Result<reqwest::Response>,
) -> Result<Response, (StatusCode, String)> {
    let response = sent.map_err(|err| {
        error!("error connecting to Ollama while {verb} model: {err}");
        (
            StatusCode::BAD_GATEWAY,
            format!(
                "Could not connect to Ollama. Please ensure Ollama is running on {}. {err}",
                backend.base_url()
            ),
        )
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|err| {
        error!("error reading Ollama response while {verb} model: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error reading Ollama response: {err}"),
        )
    })?;

    if !status.is_success() {
        error!("Ollama API returned status {status} while {verb} model: {body}");
        return Err((
            status,
            format!(
                "Ollama API error {verb} model: status {}, message: {}",
                status.as_u16(),
                body.trim()
            ),
        ));
    }

    Ok(([(header::CONTENT_TYPE, "text/plain")], body).into_response())
}
