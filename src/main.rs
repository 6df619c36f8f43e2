use std::time::Duration;

use clap::Parser;

use ollama_relay::backend::{DEFAULT_BASE_URL, OllamaBackend};

#[derive(Debug, Parser)]
#[command(version, about = "HTTP relay for a local Ollama server with SSE streaming")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// Base URL of the Ollama server
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    ollama_url: String,

    /// Timeout in seconds for generate, chat, pull and delete calls
    #[arg(long, default_value_t = 300)]
    request_timeout: u64,

    /// Timeout in seconds for model listing calls
    #[arg(long, default_value_t = 10)]
    list_timeout: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let backend = OllamaBackend::new(
        args.ollama_url,
        Duration::from_secs(args.request_timeout),
        Duration::from_secs(args.list_timeout),
    )
    .expect("Failed to build HTTP clients");

    tracing::info!("Relaying to Ollama at {}", backend.base_url());

    let app = ollama_relay::app(backend);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .expect("Failed to bind listen address");

    tracing::info!("Ollama relay listening on http://{}", args.bind);
    tracing::info!("Available endpoints:");
    tracing::info!("  - GET  /health       - Health check");
    tracing::info!("  - GET  /models       - List installed models");
    tracing::info!("  - POST /relay-action - Generate/chat (SSE), pull, delete");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
