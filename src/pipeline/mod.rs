//! Pipeline stages for recipe extraction.
//!
//! ## Data Flow
//!
//! ```text
//! load ──▶ chunk ──▶ chain ──▶ postprocess
//! (pdfium)  (split)   (LLM)    (reply cleanup)
//! ```
//!
//! 1. [`load`]: read the selected pages of a local PDF; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 2. [`chunk`]: split page text into overlapping windows on natural
//!    boundaries
//! 3. [`chain`]: render the prompt, call the model with the recipe schema and
//!    validate the reply; the only stage with network I/O
//! 4. [`postprocess`]: strip fences and invisible characters from raw replies

pub mod chain;
pub mod chunk;
pub mod load;
pub mod postprocess;
