use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

// Ollama's pull and delete endpoints take the model under "name".
#[derive(Debug, Serialize)]
pub struct ModelActionRequest {
    #[serde(rename = "name")]
    pub model: String,
}

/// One line of an Ollama NDJSON stream. Generate responses carry `response`,
/// chat responses carry `message`; the final chunk sets `done`.
#[derive(Debug, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    pub models: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
}

/// HTTP client wrapper around the Ollama API. Generation, pull and delete
/// calls share a long timeout; listing uses a short one.
#[derive(Clone)]
pub struct OllamaBackend {
    base_url: String,
    client: reqwest::Client,
    list_client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        list_timeout: Duration,
    ) -> reqwest::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().timeout(request_timeout).build()?,
            list_client: reqwest::Client::builder().timeout(list_timeout).build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn generate(&self, payload: &GenerateRequest) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}/api/generate", self.base_url))
            .json(payload)
            .send()
            .await
    }

    pub async fn chat(&self, payload: &ChatRequest) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}/api/chat", self.base_url))
            .json(payload)
            .send()
            .await
    }

    pub async fn pull(&self, model: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}/api/pull", self.base_url))
            .json(&ModelActionRequest {
                model: model.to_string(),
            })
            .send()
            .await
    }

    pub async fn delete(&self, model: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(format!("{}/api/delete", self.base_url))
            .json(&ModelActionRequest {
                model: model.to_string(),
            })
            .send()
            .await
    }

    pub async fn tags(&self) -> reqwest::Result<reqwest::Response> {
        self.list_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
    }
}
