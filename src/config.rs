//! Configuration types for recipe extraction.
//!
//! All run behaviour is controlled through [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`]. The builder clamps obviously out-of-range
//! values and `build()` rejects combinations the pipeline cannot run with
//! (overlap not smaller than the chunk size, empty model id, bad URL).

use crate::error::ExtractError;
use crate::model::ExtractionModel;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Context budget the default chunk size is derived from, in characters.
pub const DEFAULT_CONTEXT_CHARS: usize = 128_000;

/// 80% of the context budget, leaving room for the prompt and the reply.
pub const DEFAULT_CHUNK_SIZE: usize = DEFAULT_CONTEXT_CHARS * 4 / 5;

/// Characters shared between consecutive chunks of a page.
pub const DEFAULT_CHUNK_OVERLAP: usize = 20;

pub const DEFAULT_MODEL: &str = "mistral:7b-instruct";

pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Port assumed when a host is given without scheme or port (`OLLAMA_HOST=0.0.0.0`).
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Configuration for a recipe extraction run.
///
/// # Example
/// ```rust
/// use recipe_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("llama3.1:8b")
///     .chunk_size(8_000)
///     .chunk_overlap(50)
///     .build()
///     .unwrap();
/// assert_eq!(config.temperature, 0.0);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Ollama model identifier. Default: `mistral:7b-instruct`.
    pub model: String,

    /// Base URL of the Ollama server. Default: `http://127.0.0.1:11434`.
    pub ollama_url: String,

    /// Pre-constructed model backend. Takes precedence over `model` / `ollama_url`.
    pub backend: Option<Arc<dyn ExtractionModel>>,

    /// Sampling temperature. Default: 0.0 (most reproducible).
    pub temperature: f32,

    /// Maximum chunk length in characters. Default: 102 400.
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks. Default: 20.
    ///
    /// Keeps an ingredient line that straddles a cut visible in both chunks.
    pub chunk_overlap: usize,

    /// Free-text description of what to extract. If None, uses the built-in default.
    pub instruction: Option<String>,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Per-call timeout in seconds. Default: None (wait indefinitely).
    pub api_timeout_secs: Option<u64>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            backend: None,
            temperature: 0.0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            instruction: None,
            system_prompt: None,
            password: None,
            pages: PageSelection::default(),
            api_timeout_secs: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("ollama_url", &self.ollama_url)
            .field("backend", &self.backend.as_ref().map(|_| "<dyn ExtractionModel>"))
            .field("temperature", &self.temperature)
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("instruction", &self.instruction)
            .field("system_prompt", &self.system_prompt.as_ref().map(|p| p.len()))
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pages", &self.pages)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.config.ollama_url = url.into();
        self
    }

    pub fn backend(mut self, backend: Arc<dyn ExtractionModel>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    /// Clamped to 0.0–2.0. Non-finite values are kept and rejected by `build()`.
    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = if t.is_finite() { t.clamp(0.0, 2.0) } else { t };
        self
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n;
        self
    }

    pub fn chunk_overlap(mut self, n: usize) -> Self {
        self.config.chunk_overlap = n;
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs.max(1));
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Without a `backend`, the Ollama URL is normalised here (see
    /// [`normalize_ollama_url`]) so a bad host fails before the PDF is read.
    pub fn build(mut self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        validate_chunking(c.chunk_size, c.chunk_overlap)?;
        if !c.temperature.is_finite() {
            return Err(ExtractError::InvalidConfig(format!(
                "temperature must be a finite number, got {}",
                c.temperature
            )));
        }
        if c.backend.is_none() {
            if c.model.trim().is_empty() {
                return Err(ExtractError::InvalidConfig("Model id must not be empty".into()));
            }
            self.config.ollama_url = normalize_ollama_url(&self.config.ollama_url)?.to_string();
        }
        Ok(self.config)
    }
}

/// Turn an Ollama base URL or an `OLLAMA_HOST`-style host into an absolute
/// http(s) URL whose path ends in `/`.
///
/// Accepts what `ollama serve` accepts: `0.0.0.0`, `127.0.0.1:11434`,
/// `localhost:11434` and full `http(s)://` URLs. A scheme-less host gets
/// `http://` and, without an explicit port, [`DEFAULT_OLLAMA_PORT`].
pub fn normalize_ollama_url(raw: &str) -> Result<Url, ExtractError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidConfig("Ollama URL must not be empty".into()));
    }

    let scheme_less = !trimmed.contains("://");
    let candidate = if scheme_less {
        format!("http://{trimmed}")
    } else {
        trimmed.to_string()
    };
    let mut url = Url::parse(&candidate).map_err(|e| {
        ExtractError::InvalidConfig(format!("Invalid Ollama URL '{trimmed}': {e}"))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return Err(ExtractError::InvalidConfig(format!(
            "Ollama URL must be http(s) with a host, got '{trimmed}'"
        )));
    }
    if scheme_less && url.port().is_none() {
        url.set_port(Some(DEFAULT_OLLAMA_PORT)).map_err(|_| {
            ExtractError::InvalidConfig(format!("Ollama URL '{trimmed}' cannot carry a port"))
        })?;
    }
    // `api/chat` is appended to the base.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Shared check for chunk parameters, used by the builder and the chunker.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<(), ExtractError> {
    if chunk_size == 0 {
        return Err(ExtractError::InvalidConfig("chunk_size must be ≥ 1".into()));
    }
    if chunk_overlap >= chunk_size {
        return Err(ExtractError::InvalidConfig(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Specifies which pages of the PDF to extract from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// First page the selection names (1-indexed), for error reporting.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn defaults_follow_context_budget() {
        let config = ExtractionConfig::default();
        assert_eq!(config.chunk_size, 102_400);
        assert_eq!(config.chunk_overlap, 20);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.model, "mistral:7b-instruct");
        assert!(config.api_timeout_secs.is_none());
    }

    #[test]
    fn overlap_not_smaller_than_size_is_config_error() {
        let err = ExtractionConfig::builder()
            .chunk_size(100)
            .chunk_overlap(100)
            .build()
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let result = ExtractionConfig::builder()
            .chunk_size(0)
            .chunk_overlap(0)
            .build();
        assert!(matches!(result, Err(ExtractError::InvalidConfig(_))));
    }

    #[test]
    fn bad_url_is_rejected() {
        let result = ExtractionConfig::builder().ollama_url("not a url").build();
        assert!(matches!(result, Err(ExtractError::InvalidConfig(_))));
    }

    #[test]
    fn ollama_host_forms_are_normalised() {
        for (raw, expected) in [
            ("0.0.0.0", "http://0.0.0.0:11434/"),
            ("127.0.0.1:11434", "http://127.0.0.1:11434/"),
            ("localhost:11434", "http://localhost:11434/"),
            ("localhost", "http://localhost:11434/"),
            (" http://127.0.0.1:11434 ", "http://127.0.0.1:11434/"),
            ("https://ollama.internal", "https://ollama.internal/"),
            ("http://gpu-box:8080/ollama", "http://gpu-box:8080/ollama/"),
        ] {
            let config = ExtractionConfig::builder().ollama_url(raw).build().unwrap();
            assert_eq!(config.ollama_url, expected, "for {raw:?}");
        }
    }

    #[test]
    fn non_http_ollama_url_fails_at_build() {
        for raw in ["ftp://localhost", "", "http://", "file:///tmp/ollama.sock"] {
            let result = ExtractionConfig::builder().ollama_url(raw).build();
            assert!(
                matches!(result, Err(ExtractError::InvalidConfig(_))),
                "{raw:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn ollama_url_is_not_checked_with_a_backend() {
        struct Silent;
        #[async_trait::async_trait]
        impl ExtractionModel for Silent {
            fn name(&self) -> &str {
                "silent"
            }
            async fn chat(
                &self,
                _request: crate::model::ModelRequest<'_>,
            ) -> Result<crate::model::ModelResponse, ExtractError> {
                Ok(Default::default())
            }
        }
        let config = ExtractionConfig::builder()
            .backend(Arc::new(Silent))
            .ollama_url("ftp://unused")
            .build()
            .unwrap();
        assert_eq!(config.ollama_url, "ftp://unused");
    }

    #[test]
    fn non_finite_temperature_is_rejected() {
        for t in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let result = ExtractionConfig::builder().temperature(t).build();
            assert!(matches!(result, Err(ExtractError::InvalidConfig(_))), "{t}");
        }
    }

    #[test]
    fn temperature_is_clamped() {
        let config = ExtractionConfig::builder()
            .temperature(-1.0)
            .build()
            .unwrap();
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn debug_redacts_password() {
        let config = ExtractionConfig::builder()
            .password("hunter2")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(9).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 10).to_indices(4), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }
}
