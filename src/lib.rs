use axum::{
    Router,
    routing::{get, post},
};

pub mod api;
pub mod backend;

use backend::OllamaBackend;

#[derive(Clone)]
pub struct AppState {
    pub backend: OllamaBackend,
}

pub fn app(backend: OllamaBackend) -> Router {
    Router::new()
        .route("/health", get(api::health_check))
        .route("/models", get(api::list_models))
        .route("/relay-action", post(api::relay_action))
        .with_state(AppState { backend })
}
