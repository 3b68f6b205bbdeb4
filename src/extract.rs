//! Extraction entry points: load → chunk → extract → collect.
//!
//! Chunks are sent to the model one at a time and in order. A failure at any
//! stage aborts the run and discards results gathered so far, so callers
//! either get every chunk's extraction or an error.

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::model::{ExtractionModel, OllamaModel};
use crate::output::{ExtractionOutput, ExtractionResult, ExtractionStats};
use crate::pipeline::chain::ExtractionChain;
use crate::pipeline::chunk::RecursiveCharacterSplitter;
use crate::pipeline::load::{self, Document};
use crate::prompts::{PromptTemplate, DEFAULT_INSTRUCTION, DEFAULT_SYSTEM_PROMPT};
use crate::schema::RecipeSchema;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract recipes from a PDF file.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - Load errors (missing file, not a PDF, pdfium unavailable) before any
///   chunking or model call
/// - `InvalidConfig` for bad chunk parameters or model settings
/// - Model-invocation errors for the first chunk that fails
///
/// # Example
/// ```rust,no_run
/// use recipe_extract::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let output = extract("recipe.pdf", &config).await?;
/// print!("{}", output.render()?);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let total_start = Instant::now();
    let path = path.as_ref();
    info!("Starting extraction: {}", path.display());

    // ── Step 1: Load pages ───────────────────────────────────────────────
    let load_start = Instant::now();
    let documents =
        load::load_pdf(path, config.password.as_deref(), &config.pages).await?;
    let load_duration_ms = load_start.elapsed().as_millis() as u64;
    info!("Loaded {} pages in {}ms", documents.len(), load_duration_ms);

    // ── Step 2..4: Chunk, extract, collect ───────────────────────────────
    let mut output = extract_documents(&documents, config).await?;
    output.stats.load_duration_ms = load_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {} recipes from {} chunks, {}ms total",
        output.stats.recipes, output.stats.chunks, output.stats.total_duration_ms
    );
    Ok(output)
}

/// Run chunking and extraction over already-loaded documents.
pub async fn extract_documents(
    documents: &[Document],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    let start = Instant::now();

    // Config problems surface before any model call.
    let splitter = RecursiveCharacterSplitter::new(config.chunk_size, config.chunk_overlap)?;
    let chain = build_chain(config)?;

    let chunks = splitter.split_documents(documents);
    info!(
        "Split {} pages into {} chunks (size={}, overlap={}), model={}",
        documents.len(),
        chunks.len(),
        splitter.chunk_size(),
        splitter.chunk_overlap(),
        chain.model_name()
    );

    let llm_start = Instant::now();
    let mut results = Vec::with_capacity(chunks.len());
    for chunk in &chunks {
        debug!(
            "Extracting chunk {}/{} (page {}, {} chars)",
            chunk.chunk_index + 1,
            chunks.len(),
            chunk.metadata.page,
            chunk.char_len()
        );
        let out = chain.invoke(chunk).await?;
        results.push(ExtractionResult {
            chunk_index: chunk.chunk_index,
            page: chunk.metadata.page,
            text: out.extraction,
            prompt_tokens: out.prompt_tokens,
            completion_tokens: out.completion_tokens,
            duration_ms: out.duration.as_millis() as u64,
        });
    }
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let mut output = ExtractionOutput {
        results,
        stats: ExtractionStats::default(),
    };
    let results = &output.results;
    let stats = ExtractionStats {
        pages: documents.len(),
        chunks: results.len(),
        recipes: output.recipes().count(),
        ingredients: output.recipes().map(|r| r.ingredients.len()).sum(),
        total_prompt_tokens: results.iter().map(|r| r.prompt_tokens as u64).sum(),
        total_completion_tokens: results.iter().map(|r| r.completion_tokens as u64).sum(),
        load_duration_ms: 0,
        llm_duration_ms,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    output.stats = stats;

    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(extract(path, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn build_chain(config: &ExtractionConfig) -> Result<ExtractionChain, ExtractError> {
    let template = PromptTemplate::new(
        config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT),
        config.instruction.as_deref().unwrap_or(DEFAULT_INSTRUCTION),
    );
    Ok(ExtractionChain::new(
        resolve_model(config)?,
        template,
        RecipeSchema::default(),
        config.temperature,
    ))
}

/// Use the caller's backend if one was supplied, otherwise talk to Ollama.
pub fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn ExtractionModel>, ExtractError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }
    Ok(Arc::new(OllamaModel::from_config(config)?))
}
