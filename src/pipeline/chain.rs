//! Extraction chain: one chunk in, one schema-valid [`RecipeExtraction`] out.
//!
//! The chain renders the prompt template, calls the model with the schema as
//! its structured-output format, and then refuses to trust the reply until
//! it has been cleaned, parsed and validated. Every failure is returned as a
//! model-invocation error; retrying is the caller's business, and the driver
//! does not retry.

use crate::error::ExtractError;
use crate::model::{ExtractionModel, ModelRequest};
use crate::pipeline::chunk::Chunk;
use crate::pipeline::postprocess::{clean_reply, excerpt};
use crate::prompts::PromptTemplate;
use crate::schema::{RecipeExtraction, RecipeSchema};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const EXCERPT_CHARS: usize = 120;

/// Result of running the chain on one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutput {
    pub extraction: RecipeExtraction,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub duration: Duration,
}

/// Prompt template + schema-constrained model call.
pub struct ExtractionChain {
    model: Arc<dyn ExtractionModel>,
    template: PromptTemplate,
    schema: RecipeSchema,
    temperature: f32,
}

impl ExtractionChain {
    pub fn new(
        model: Arc<dyn ExtractionModel>,
        template: PromptTemplate,
        schema: RecipeSchema,
        temperature: f32,
    ) -> Self {
        Self {
            model,
            template,
            schema,
            temperature,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Run the chain on a chunk.
    pub async fn invoke(&self, chunk: &Chunk) -> Result<ChainOutput, ExtractError> {
        self.invoke_text(&chunk.content, chunk.chunk_index).await
    }

    /// Run the chain on raw text; `chunk_index` only labels errors and logs.
    pub async fn invoke_text(
        &self,
        text: &str,
        chunk_index: usize,
    ) -> Result<ChainOutput, ExtractError> {
        let start = Instant::now();
        let messages = self.template.render(text);

        let response = self
            .model
            .chat(ModelRequest {
                messages: &messages,
                schema: &self.schema,
                temperature: self.temperature,
                chunk_index,
            })
            .await?;

        let extraction = self.parse_reply(&response.content, chunk_index)?;
        let duration = start.elapsed();
        debug!(
            "Chunk {}: {} recipes, {} in / {} out tokens, {:?}",
            chunk_index,
            extraction.recipes.len(),
            response.prompt_tokens,
            response.completion_tokens,
            duration
        );

        Ok(ChainOutput {
            extraction,
            prompt_tokens: response.prompt_tokens,
            completion_tokens: response.completion_tokens,
            duration,
        })
    }

    /// Clean, parse and validate a raw reply.
    pub fn parse_reply(
        &self,
        raw: &str,
        chunk_index: usize,
    ) -> Result<RecipeExtraction, ExtractError> {
        let cleaned = clean_reply(raw);
        let value: serde_json::Value =
            serde_json::from_str(&cleaned).map_err(|e| ExtractError::InvalidModelOutput {
                chunk: chunk_index,
                detail: e.to_string(),
                excerpt: excerpt(raw, EXCERPT_CHARS),
            })?;

        self.schema
            .parse(value)
            .map_err(|violation| ExtractError::SchemaViolation {
                chunk: chunk_index,
                pointer: violation.pointer,
                detail: violation.detail,
            })
    }
}
