//! Output types returned by an extraction run.

use crate::error::ExtractError;
use crate::schema::RecipeExtraction;
use serde::Serialize;
use std::io::Write;

/// Indentation used for every printed JSON document.
pub const JSON_INDENT: &[u8] = b"    ";

/// Extraction result for one chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionResult {
    pub chunk_index: usize,
    /// 1-indexed page the chunk was cut from.
    pub page: usize,
    /// Parsed, schema-valid recipe data.
    pub text: RecipeExtraction,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub duration_ms: u64,
}

/// Aggregate numbers for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub pages: usize,
    pub chunks: usize,
    pub recipes: usize,
    pub ingredients: usize,
    pub total_prompt_tokens: u64,
    pub total_completion_tokens: u64,
    pub load_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run produced, in chunk order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionOutput {
    pub results: Vec<ExtractionResult>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    /// All recipes across chunks, in order. Recipes cut by a chunk boundary
    /// may appear twice.
    pub fn recipes(&self) -> impl Iterator<Item = &crate::schema::Recipe> {
        self.results.iter().flat_map(|r| r.text.recipes.iter())
    }

    /// Render each result's `text` as an indented JSON document, one per line group.
    pub fn render(&self) -> Result<String, ExtractError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ExtractError::Internal(e.to_string()))
    }

    /// Write the rendered documents to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), ExtractError> {
        for result in &self.results {
            let json = to_pretty_json(&result.text)?;
            writeln!(out, "{json}")
                .map_err(|e| ExtractError::Internal(format!("Failed to write results: {e}")))?;
        }
        Ok(())
    }
}

/// Serialise `value` with 4-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ExtractError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| ExtractError::Internal(format!("JSON serialisation failed: {e}")))?;
    String::from_utf8(buf).map_err(|e| ExtractError::Internal(e.to_string()))
}
