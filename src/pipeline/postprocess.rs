//! Post-processing: deterministic cleanup of raw model replies.
//!
//! With a JSON-schema `format` the reply is usually bare JSON, but local
//! models still occasionally wrap it in a ```` ```json ```` fence, prefix a
//! byte-order mark, or pad it with blank lines. These rules remove exactly
//! those artefacts and never touch the JSON itself, so a reply that is
//! already clean passes through unchanged.
//!
//! Rules (applied in order):
//! 1. Strip invisible leading characters (BOM, zero-width space)
//! 2. Strip an outer code fence, with or without a `json` tag
//! 3. Trim surrounding whitespace

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw reply.
pub fn clean_reply(input: &str) -> String {
    let s = strip_invisible_prefix(input);
    let s = strip_code_fences(s);
    s.trim().to_string()
}

/// A short single-line excerpt of a reply for error messages.
pub fn excerpt(input: &str, max_chars: usize) -> String {
    let flat: String = input
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .take(max_chars)
        .collect();
    if input.chars().count() > max_chars {
        format!("{flat}…")
    } else {
        flat
    }
}

// ── Rule 1: Invisible prefix ─────────────────────────────────────────────────

fn strip_invisible_prefix(input: &str) -> &str {
    input.trim_start_matches(['\u{FEFF}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}'])
}

// ── Rule 2: Outer code fences ────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```\s*$").unwrap()
});

fn strip_code_fences(input: &str) -> &str {
    let trimmed = input.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps.get(1).map_or(trimmed, |m| m.as_str()),
        None => input,
    }
}
