//! Language detection and file filtering.
//!
//! A file is summarized only when its extension maps to a [`Language`] and
//! its leading bytes look like hand-written source text.

use std::path::Path;

use thiserror::Error;

/// Files larger than this are skipped unless the caller raises the limit.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Number of leading bytes inspected by the content heuristics.
pub const SAMPLE_SIZE: usize = 1024;

const MINIFIED_AVG_LINE_LEN: usize = 500;

/// A supported source language.
///
/// Every variant has exactly one extractor in [`crate::codemap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum Language {
    Cpp,
    CSharp,
    Python,
    JavaScript,
    Cshtml,
}

impl Language {
    /// All supported languages, in display order.
    pub fn all() -> &'static [Language] {
        &[
            Language::Cpp,
            Language::CSharp,
            Language::Python,
            Language::JavaScript,
            Language::Cshtml,
        ]
    }

    /// File extensions (without the dot) mapped to this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Cpp => &["cpp", "h", "c", "hpp", "cc", "cxx", "hh", "hxx"],
            Language::CSharp => &["cs"],
            Language::Python => &["py"],
            Language::JavaScript => &["js", "mjs", "cjs"],
            Language::Cshtml => &["cshtml"],
        }
    }

    /// Resolve an extension (case-insensitive, no dot).
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_ascii_lowercase();
        Language::all()
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Language::Cpp => "C/C++",
            Language::CSharp => "C#",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::Cshtml => "CSHTML",
        };
        f.write_str(name)
    }
}

/// Error parsing a language name.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
}

impl std::str::FromStr for Language {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpp" | "c++" | "c" | "c/c++" => Ok(Language::Cpp),
            "csharp" | "c#" | "cs" => Ok(Language::CSharp),
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" => Ok(Language::JavaScript),
            "cshtml" | "razor" => Ok(Language::Cshtml),
            other => Language::from_extension(other)
                .ok_or_else(|| FilterError::UnknownLanguage(s.to_string())),
        }
    }
}

/// Detect the language of a file from its extension.
///
/// Returns `None` for unsupported files; callers skip them.
///
/// ```
/// use codesum::filter::{detect_language, Language};
/// use std::path::Path;
///
/// assert_eq!(detect_language(Path::new("src/app.py")), Some(Language::Python));
/// assert_eq!(detect_language(Path::new("package.json")), None);
/// ```
pub fn detect_language(path: &Path) -> Option<Language> {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(Language::from_extension)
}

/// Why a file was not summarized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Unsupported,
    Binary,
    Minified,
    TooLarge,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Unsupported => write!(f, "unsupported language"),
            RejectReason::Binary => write!(f, "binary content"),
            RejectReason::Minified => write!(f, "minified content"),
            RejectReason::TooLarge => write!(f, "file too large"),
        }
    }
}

/// Outcome of filtering a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterResult {
    Accept(Language),
    Reject(RejectReason),
}

/// Extension-only check, used before any file is opened.
pub fn passes_extension_filter(path: &Path) -> Option<Language> {
    detect_language(path)
}

/// Decide whether a file should be summarized.
///
/// `sample` is the first bytes of the file (up to [`SAMPLE_SIZE`]) and
/// `size` its total length.
pub fn should_process(path: &Path, sample: &[u8], size: u64, max_size: u64) -> FilterResult {
    let Some(language) = detect_language(path) else {
        return FilterResult::Reject(RejectReason::Unsupported);
    };

    if size > max_size {
        return FilterResult::Reject(RejectReason::TooLarge);
    }

    let sample = &sample[..sample.len().min(SAMPLE_SIZE)];
    if sample.contains(&0) {
        return FilterResult::Reject(RejectReason::Binary);
    }

    if is_minified(path, sample) {
        return FilterResult::Reject(RejectReason::Minified);
    }

    FilterResult::Accept(language)
}

fn is_minified(path: &Path, sample: &[u8]) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".min.js") {
        return true;
    }

    // Only a full sample says anything about line length.
    if sample.len() < SAMPLE_SIZE {
        return false;
    }
    let newlines = bytecount::count(sample, b'\n');
    sample.len() / (newlines + 1) > MINIFIED_AVG_LINE_LEN
}
