//! Token counts for the finished summary.
//!
//! The point of a summary is to fit into a model's context window, so the
//! CLI reports its size in tokens. Counting uses tiktoken-rs and falls back
//! to a character estimate when a tokenizer cannot be loaded.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use tiktoken_rs::CoreBPE;

/// Tokenizer used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// GPT-4 and GPT-3.5 family.
    #[default]
    Cl100kBase,
    /// GPT-4o family.
    O200kBase,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Cl100kBase => "cl100k_base",
            Encoding::O200kBase => "o200k_base",
        })
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cl100k" | "cl100k_base" => Ok(Encoding::Cl100kBase),
            "o200k" | "o200k_base" => Ok(Encoding::O200kBase),
            _ => Err(format!("unknown encoding: {s} (expected cl100k_base or o200k_base)")),
        }
    }
}

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();
static O200K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn tokenizer(encoding: Encoding) -> Option<&'static CoreBPE> {
    let cell = match encoding {
        Encoding::Cl100kBase => &CL100K,
        Encoding::O200kBase => &O200K,
    };
    cell.get_or_init(|| {
        let loaded = match encoding {
            Encoding::Cl100kBase => tiktoken_rs::cl100k_base(),
            Encoding::O200kBase => tiktoken_rs::o200k_base(),
        };
        loaded
            .map_err(|e| tracing::warn!(%encoding, error = %e, "tokenizer unavailable, estimating"))
            .ok()
    })
    .as_ref()
}

/// Roughly four bytes per token, rounded up.
fn estimate(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Count the tokens in `text`. Never fails.
///
/// ```
/// use codesum::tokens::{count_tokens, Encoding};
///
/// assert!(count_tokens("-- FILE: a.py (Python) --", Encoding::default()) > 0);
/// ```
pub fn count_tokens(text: &str, encoding: Encoding) -> usize {
    if text.is_empty() {
        return 0;
    }
    match tokenizer(encoding) {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => estimate(text),
    }
}
