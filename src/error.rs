//! Error types for the recipe-extract library.
//!
//! Every failure is fatal for the run: the pipeline has no retry and no
//! partial-output mode, so a single enum is enough. Variants are grouped by
//! the stage that raises them and [`ExtractError::category`] exposes that
//! grouping to callers (the CLI, tests) without string matching:
//!
//! * [`ErrorCategory::Load`]: the PDF could not be opened or read. Raised
//!   before any chunking happens.
//! * [`ErrorCategory::Config`]: invalid parameters. Raised before any model
//!   call.
//! * [`ErrorCategory::ModelInvocation`]: the model endpoint failed or its
//!   reply did not match the recipe schema.

use std::path::PathBuf;
use thiserror::Error;

/// Stage a fatal error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Load,
    Config,
    ModelInvocation,
    Internal,
}

/// All fatal errors returned by the recipe-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Load errors ───────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Text extraction failed for a specific page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library at runtime. You can:\n\
  • Install libpdfium system-wide (e.g. from bblanchon/pdfium-binaries).\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n"
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or chunker validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Model invocation errors ───────────────────────────────────────────
    /// The model endpoint could not be reached at all.
    #[error("Model endpoint '{url}' is unreachable: {detail}\nIs Ollama running? Start it with `ollama serve`.")]
    ModelUnreachable { url: String, detail: String },

    /// The model call exceeded the configured timeout.
    #[error("Model call for chunk {chunk} timed out after {secs}s")]
    ModelTimeout { chunk: usize, secs: u64 },

    /// The endpoint answered with an error (unknown model, HTTP 5xx, …).
    #[error("Model '{model}' returned an error: {message}")]
    ModelApiError { model: String, message: String },

    /// The reply could not be parsed as JSON.
    #[error("Model output for chunk {chunk} is not valid JSON: {detail}\nOutput starts with: {excerpt:?}")]
    InvalidModelOutput {
        chunk: usize,
        detail: String,
        excerpt: String,
    },

    /// The reply was JSON but does not satisfy the recipe schema.
    #[error("Model output for chunk {chunk} violates the recipe schema at '{pointer}': {detail}")]
    SchemaViolation {
        chunk: usize,
        pointer: String,
        detail: String,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// The pipeline stage this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ExtractError::FileNotFound { .. }
            | ExtractError::PermissionDenied { .. }
            | ExtractError::NotAPdf { .. }
            | ExtractError::CorruptPdf { .. }
            | ExtractError::PasswordRequired { .. }
            | ExtractError::WrongPassword { .. }
            | ExtractError::PageOutOfRange { .. }
            | ExtractError::TextExtractionFailed { .. }
            | ExtractError::PdfiumBindingFailed(_) => ErrorCategory::Load,
            ExtractError::InvalidConfig(_) => ErrorCategory::Config,
            ExtractError::ModelUnreachable { .. }
            | ExtractError::ModelTimeout { .. }
            | ExtractError::ModelApiError { .. }
            | ExtractError::InvalidModelOutput { .. }
            | ExtractError::SchemaViolation { .. } => ErrorCategory::ModelInvocation,
            ExtractError::Internal(_) => ErrorCategory::Internal,
        }
    }
}
