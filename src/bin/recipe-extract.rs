//! CLI binary for recipe-extract.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints one JSON document per chunk on stdout.
//! Logs and the run summary go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use recipe_extract::config::{
    DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_MODEL, DEFAULT_OLLAMA_URL,
};
use recipe_extract::{extract, ExtractionConfig, PageSelection};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract from ./recipe.pdf with mistral:7b-instruct
  recipe-extract

  # Another file, another model
  recipe-extract cookbook.pdf --model llama3.1:8b

  # Only pages 3 to 15, smaller chunks
  recipe-extract cookbook.pdf --pages 3-15 --chunk-size 8000

  # Remote Ollama, fail a chunk after two minutes
  recipe-extract cookbook.pdf --ollama-url http://gpu-box:11434 --api-timeout 120

ENVIRONMENT VARIABLES:
  OLLAMA_HOST        Ollama host or URL (same as --ollama-url); accepts the
                     `ollama serve` forms 0.0.0.0 and 127.0.0.1:11434
  RECIPE_MODEL       Model id (same as --model)
  PDFIUM_LIB_PATH    Path to libpdfium, or the directory containing it
  RUST_LOG           Log filter, overrides -v / -q

SETUP:
  1. Start Ollama:    ollama serve
  2. Pull the model:  ollama pull mistral:7b-instruct
  3. Extract:         recipe-extract recipe.pdf > recipes.json
"#;

/// Extract structured recipes from a PDF with a local LLM.
#[derive(Parser, Debug)]
#[command(
    name = "recipe-extract",
    version,
    about = "Extract structured recipes from a PDF with a local LLM",
    long_about = "Split the text of a PDF into chunks and ask a local Ollama model to extract \
every recipe (name, ingredients with numeric amount and unit) as schema-constrained JSON. \
Prints one 4-space-indented JSON document per chunk.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    #[arg(default_value = "./recipe.pdf")]
    input: PathBuf,

    /// Ollama model id.
    #[arg(long, env = "RECIPE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Ollama base URL, or a bare host[:port] (port defaults to 11434).
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_URL)]
    ollama_url: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "RECIPE_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Maximum chunk length in characters.
    #[arg(long, env = "RECIPE_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[arg(long, env = "RECIPE_CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Description of what to extract, appended to the system prompt.
    #[arg(long, env = "RECIPE_INSTRUCTION")]
    instruction: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "RECIPE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "RECIPE_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "RECIPE_PDF_PASSWORD")]
    password: Option<String>,

    /// Per-chunk model call timeout in seconds (default: wait indefinitely).
    #[arg(long, env = "RECIPE_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&cli.input, &config)
        .await
        .with_context(|| format!("Extraction from '{}' failed", cli.input.display()))?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output
        .write_to(&mut handle)
        .context("Failed to write results to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    if !cli.quiet {
        eprintln!(
            "Extracted {} recipes ({} ingredients) from {} chunks in {}ms",
            output.stats.recipes,
            output.stats.ingredients,
            output.stats.chunks,
            output.stats.total_duration_ms
        );
        eprintln!(
            "  {} tokens in  /  {} tokens out",
            output.stats.total_prompt_tokens, output.stats.total_completion_tokens
        );
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .model(cli.model.clone())
        .ollama_url(cli.ollama_url.clone())
        .temperature(cli.temperature)
        .chunk_size(cli.chunk_size)
        .chunk_overlap(cli.chunk_overlap)
        .pages(parse_pages(&cli.pages)?);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {path:?}"))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(ref instruction) = cli.instruction {
        builder = builder.instruction(instruction.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    if let Some((start, end)) = s.split_once('-') {
        let start = parse_page(start)?;
        let end = parse_page(end)?;
        if start > end {
            anyhow::bail!("Invalid page range '{start}-{end}': start must be <= end");
        }
        return Ok(PageSelection::Range(start, end));
    }

    if s.contains(',') {
        let pages = s.split(',').map(parse_page).collect::<Result<Vec<_>>>()?;
        return Ok(PageSelection::Set(pages));
    }

    Ok(PageSelection::Single(parse_page(&s)?))
}

fn parse_page(s: &str) -> Result<usize> {
    let page: usize = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid page number: '{}'", s.trim()))?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {page})");
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_page_selections() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(
            parse_pages("1,3,5").unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
    }

    #[test]
    fn rejects_bad_page_selections() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("9-2").is_err());
        assert!(parse_pages("one").is_err());
        assert!(parse_pages("1,,2").is_err());
    }

    #[tokio::test]
    async fn accepts_ollama_host_without_scheme() {
        let cli = Cli::parse_from(["recipe-extract", "--ollama-url", "127.0.0.1:11434"]);
        let config = build_config(&cli).await.unwrap();
        assert_eq!(config.ollama_url, "http://127.0.0.1:11434/");

        let cli = Cli::parse_from(["recipe-extract", "--ollama-url", "0.0.0.0"]);
        let config = build_config(&cli).await.unwrap();
        assert_eq!(config.ollama_url, "http://0.0.0.0:11434/");
    }

    #[tokio::test]
    async fn rejects_nan_temperature() {
        let cli = Cli::parse_from(["recipe-extract", "--temperature", "NaN"]);
        assert!(build_config(&cli).await.is_err());
    }

    #[test]
    fn defaults_match_library() {
        let cli = Cli::parse_from(["recipe-extract"]);
        assert_eq!(cli.input, PathBuf::from("./recipe.pdf"));
        assert_eq!(cli.chunk_size, 102_400);
        assert_eq!(cli.chunk_overlap, 20);
        assert_eq!(cli.temperature, 0.0);
        assert!(cli.api_timeout.is_none());
    }
}
