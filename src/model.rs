//! Model backends: the seam between the extraction chain and an LLM.
//!
//! The chain only needs one operation, "send these two messages with this
//! output schema and return the raw reply", so the trait is deliberately
//! small. [`OllamaModel`] is the production backend; tests plug in stubs via
//! [`crate::config::ExtractionConfigBuilder::backend`].

use crate::config::{normalize_ollama_url, ExtractionConfig, DEFAULT_OLLAMA_PORT};
use crate::error::ExtractError;
use crate::prompts::{PromptMessage, PromptRole};
use crate::schema::RecipeSchema;
use async_trait::async_trait;
use ollama_rs::error::OllamaError;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::ChatMessage;
use ollama_rs::generation::parameters::{FormatType, JsonStructure};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;
use std::time::Duration;
use tracing::debug;

/// One schema-constrained call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub messages: &'a [PromptMessage],
    pub schema: &'a RecipeSchema,
    pub temperature: f32,
    /// Index of the chunk being extracted, for error reporting.
    pub chunk_index: usize,
}

/// Raw reply from a backend, before any parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// A language model that can answer with schema-constrained JSON.
#[async_trait]
pub trait ExtractionModel: Send + Sync {
    /// Model identifier, used in logs and error messages.
    fn name(&self) -> &str;

    async fn chat(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ExtractError>;
}

// ── Ollama ───────────────────────────────────────────────────────────────

/// Backend for a local Ollama server (`POST {base}/api/chat`).
#[derive(Debug, Clone)]
pub struct OllamaModel {
    client: Ollama,
    model: String,
    base_url: String,
    timeout_secs: Option<u64>,
}

impl OllamaModel {
    /// Build a client for `base_url`, which may also be an `OLLAMA_HOST`-style
    /// host such as `127.0.0.1:11434`. Fails with `InvalidConfig` for anything
    /// that does not normalise to an http(s) URL.
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, ExtractError> {
        let url = normalize_ollama_url(base_url)?;
        let port = url.port_or_known_default().unwrap_or(DEFAULT_OLLAMA_PORT);

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: url.to_string(),
            client: Ollama::builder()
                .host(url)
                .port(port)
                .reqwest_client(http)
                .build(),
            model: model.into(),
            timeout_secs,
        })
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Self::new(&config.ollama_url, config.model.clone(), config.api_timeout_secs)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_error(&self, err: OllamaError, chunk: usize) -> ExtractError {
        match err {
            OllamaError::ReqwestError(e) if e.is_timeout() => ExtractError::ModelTimeout {
                chunk,
                secs: self.timeout_secs.unwrap_or_default(),
            },
            OllamaError::ReqwestError(e) if e.is_connect() || e.is_request() => {
                ExtractError::ModelUnreachable {
                    url: self.base_url.clone(),
                    detail: error_chain(&e),
                }
            }
            OllamaError::ReqwestError(e) => self.api_error(error_chain(&e)),
            OllamaError::Other(body) => self.api_error(api_message(&body)),
            OllamaError::InternalError(e) => self.api_error(e.message),
            OllamaError::JsonError(e) => self.api_error(format!("malformed response envelope: {e}")),
            other => self.api_error(other.to_string()),
        }
    }

    fn api_error(&self, message: String) -> ExtractError {
        ExtractError::ModelApiError {
            model: self.model.clone(),
            message,
        }
    }
}

#[async_trait]
impl ExtractionModel for OllamaModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ExtractError> {
        let schema = schemars::Schema::try_from(request.schema.as_value().clone())
            .map_err(|e| ExtractError::Internal(format!("Recipe schema is not an object: {e}")))?;

        let messages = request
            .messages
            .iter()
            .map(|m| match m.role {
                PromptRole::System => ChatMessage::system(m.content.clone()),
                PromptRole::User => ChatMessage::user(m.content.clone()),
            })
            .collect();

        let chat = ChatMessageRequest::new(self.model.clone(), messages)
            .options(ModelOptions::default().temperature(request.temperature))
            .format(FormatType::StructuredJson(Box::new(
                JsonStructure::new_for_schema(schema),
            )));

        debug!(
            "Chunk {}: POST {}api/chat (model={}, temperature={})",
            request.chunk_index, self.base_url, self.model, request.temperature
        );

        let response = self
            .client
            .send_chat_messages(chat)
            .await
            .map_err(|e| self.map_error(e, request.chunk_index))?;

        let (prompt_tokens, completion_tokens) = response
            .final_data
            .as_ref()
            .map(|d| (d.prompt_eval_count as usize, d.eval_count as usize))
            .unwrap_or_default();

        Ok(ModelResponse {
            content: response.message.content,
            prompt_tokens,
            completion_tokens,
        })
    }
}

/// Ollama reports failures as `{"error": "..."}`; fall back to the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
