//! Codesum - Summarize the declarations of a codebase into one text file.
//!
//! Codesum walks a directory tree, pulls namespaces, types, members and
//! functions out of each source file with line-oriented heuristics, and
//! writes an indented outline of everything it found. The outline is small
//! enough to hand to a language model as context for a whole project.
//!
//! # Quick Start
//!
//! ```no_run
//! use codesum::builder::Summarizer;
//! use codesum::filter::Language;
//!
//! let summary = Summarizer::new("./my-project")
//!     .languages(&[Language::CSharp, Language::Python])
//!     .exclude_dirs(["generated"])
//!     .build()?;
//!
//! println!("Found {} declarations", summary.declaration_count());
//! println!("Total tokens: {}", summary.total_tokens());
//! # Ok::<(), codesum::CodesumError>(())
//! ```
//!
//! # Modules
//!
//! - [`tokens`] - Token counting for the finished summary
//! - [`filter`] - Language detection and content checks
//! - [`walker`] - Directory traversal with exclusion rules
//! - [`codemap`] - Heuristic declaration extraction
//! - [`output`] - Text and JSON rendering, atomic file output
//! - [`builder`] - Fluent API tying the pieces together
//!
//! # Supported Languages
//!
//! - C/C++ (`.c`, `.cpp`, `.h`, `.hpp`, ...)
//! - C# (`.cs`)
//! - Python (`.py`)
//! - JavaScript (`.js`, `.mjs`, `.cjs`)
//! - CSHTML / Razor views (`.cshtml`)

pub mod tokens;
pub mod filter;
pub mod errors;
pub mod walker;
pub mod codemap;
pub mod output;
pub mod builder;

// Re-export key types at crate root for convenience
pub use builder::{summarize_path, SkippedFile, Summarizer, Summary};
pub use codemap::{
    extract_codemap, Codemap, CodemapError, DeclKind, Declaration, Params, UNKNOWN_TYPE,
};
pub use errors::{exit_code, CodesumError};
pub use filter::{FilterError, Language};
pub use output::{OutputError, OutputFormat};
pub use tokens::{count_tokens, Encoding};
pub use walker::{WalkError, WalkOptions};
