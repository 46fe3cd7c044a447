use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body sent to `POST <base-url>/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
}

/// The server answers with `{"response": "..."}`; older builds return the
/// reply as a bare JSON string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ChatReply {
    Object { response: String },
    Text(String),
}

impl ChatReply {
    fn into_text(self) -> String {
        match self {
            ChatReply::Object { response } => response,
            ChatReply::Text(text) => text,
        }
    }
}

/// Why a chat request failed. Only ever logged; the session shows one
/// fixed warning regardless of the variant.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend returned status {0}")]
    Status(StatusCode),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("request task failed: {0}")]
    Task(String),
}

/// Something that can answer a chat request.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String, BackendError>;
}

/// HTTP client for the guideline backend
#[derive(Clone)]
pub struct CopilotClient {
    client: Client,
    base_url: String,
}

impl CopilotClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }
}

#[async_trait]
impl ChatBackend for CopilotClient {
    async fn send(&self, request: &ChatRequest) -> Result<String, BackendError> {
        let url = self.chat_url();
        tracing::debug!(%url, chars = request.message.chars().count(), "sending chat request");

        let response = self.client.post(&url).json(request).send().await?;

        if !response.status().is_success() {
            return Err(BackendError::Status(response.status()));
        }

        let body = response.text().await?;
        let reply: ChatReply = serde_json::from_str(&body)?;
        Ok(reply.into_text())
    }
}
