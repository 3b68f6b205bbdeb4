//! # recipe-extract
//!
//! Extract structured recipes (name, ingredients with numeric amounts and
//! units) from PDF documents with a local language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Load     page text via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 2. Chunk    overlapping windows cut at paragraph / line / sentence / word
//!  ├─ 3. Extract  one schema-constrained Ollama call per chunk, in order
//!  ├─ 4. Validate reply cleaned, parsed and checked against the recipe schema
//!  └─ 5. Output   one 4-space-indented JSON document per chunk
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use recipe_extract::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Talks to Ollama at http://127.0.0.1:11434 with mistral:7b-instruct
//!     let config = ExtractionConfig::default();
//!     let output = extract("recipe.pdf", &config).await?;
//!     print!("{}", output.render()?);
//!     eprintln!("{} recipes from {} chunks", output.stats.recipes, output.stats.chunks);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `recipe-extract` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## Runtime Requirements
//!
//! - A pdfium shared library, found via `PDFIUM_LIB_PATH`, the working
//!   directory, or the system library path.
//! - An Ollama server (0.5 or newer, for structured outputs) with the model
//!   pulled: `ollama pull mistral:7b-instruct`.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, PageSelection};
pub use error::{ErrorCategory, ExtractError};
pub use extract::{extract, extract_documents, extract_sync};
pub use model::{ExtractionModel, ModelRequest, ModelResponse, OllamaModel};
pub use output::{ExtractionOutput, ExtractionResult, ExtractionStats};
pub use pipeline::chunk::{Chunk, RecursiveCharacterSplitter};
pub use pipeline::load::{Document, PageMetadata};
pub use schema::{Ingredient, Recipe, RecipeExtraction, RecipeSchema};
