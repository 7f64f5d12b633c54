//! Fluent builder API for codesum.
//!
//! Ties the walker, the content filter, the extractors and the renderer
//! together. Files are extracted in parallel but always come back in walk
//! order, so the same tree produces the same summary.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::codemap::{extract_codemap, Codemap, CodemapError};
use crate::errors::CodesumError;
use crate::filter::{
    passes_extension_filter, should_process, FilterResult, Language, RejectReason,
    DEFAULT_MAX_FILE_SIZE,
};
use crate::output::{assemble, format_json, render_codemap, OutputError};
use crate::tokens::{count_tokens, Encoding};
use crate::walker::{walk_files, WalkOptions};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Builder for summarizing a codebase.
///
/// # Examples
///
/// ```no_run
/// use codesum::builder::Summarizer;
/// use codesum::filter::Language;
///
/// let summary = Summarizer::new("./project")
///     .exclude_dirs(["generated"])
///     .languages(&[Language::CSharp, Language::Cshtml])
///     .build()?;
///
/// println!("{}", summary.render_text());
/// # Ok::<(), codesum::CodesumError>(())
/// ```
pub struct Summarizer {
    root: PathBuf,
    languages: Option<Vec<Language>>,
    walk_options: WalkOptions,
    max_file_size: u64,
    encoding: Encoding,
}

impl Summarizer {
    /// Create a new builder for the given root path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            languages: None,
            walk_options: WalkOptions::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            encoding: Encoding::default(),
        }
    }

    /// Also skip directories matching these patterns.
    pub fn exclude_dirs<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.walk_options = self.walk_options.exclude(patterns);
        self
    }

    /// Walk into `node_modules`, `bin`, `.git` and the other default
    /// exclusions.
    pub fn no_default_excludes(mut self) -> Self {
        self.walk_options = self.walk_options.without_default_excludes();
        self
    }

    /// Filter to specific languages only.
    pub fn languages(mut self, langs: &[Language]) -> Self {
        self.languages = Some(langs.to_vec());
        self
    }

    /// Include hidden files (default: true).
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.walk_options.include_hidden = include;
        self
    }

    /// Skip files listed in `.gitignore` (default: false).
    pub fn respect_gitignore(mut self, respect: bool) -> Self {
        self.walk_options.respect_gitignore = respect;
        self
    }

    /// Also read these files as ignore files, in `.gitignore` syntax.
    pub fn ignore_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.walk_options
            .custom_ignores
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// Follow symbolic links while walking.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.walk_options.follow_symlinks = follow;
        self
    }

    /// Set maximum directory depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.walk_options.max_depth = Some(depth);
        self
    }

    /// Skip files larger than `bytes`.
    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Tokenizer used for the summary's token count.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Walk the root and extract every supported file.
    ///
    /// Only problems with the root itself are errors. Files that cannot be
    /// read or decoded are logged and listed in [`Summary::skipped`].
    pub fn build(self) -> Result<Summary, CodesumError> {
        let files = self.collect_files()?;
        debug!(files = files.len(), root = %self.root.display(), "extracting");

        let max_file_size = self.max_file_size;
        let results: Vec<(PathBuf, Result<Codemap, CodemapError>)> = files
            .into_par_iter()
            .map(|(path, relative)| {
                let result = read_source(&path, max_file_size)
                    .map(|(content, language)| extract_codemap(&relative, &content, language));
                (relative, result)
            })
            .collect();

        let mut codemaps = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for (relative, result) in results {
            match result {
                Ok(codemap) => {
                    debug!(
                        path = %codemap.display_path(),
                        declarations = codemap.declarations.len(),
                        "extracted"
                    );
                    codemaps.push(codemap);
                }
                Err(e) => {
                    warn!(error = %e, "skipping file");
                    skipped.push(SkippedFile {
                        path: relative,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(files = codemaps.len(), skipped = skipped.len(), "summary ready");
        Ok(Summary {
            root: self.root,
            codemaps,
            skipped,
            encoding: self.encoding,
        })
    }

    /// Supported files in walk order, as (path, path relative to root).
    fn collect_files(&self) -> Result<Vec<(PathBuf, PathBuf)>, CodesumError> {
        let mut files = Vec::new();

        for entry in walk_files(&self.root, &self.walk_options)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };

            let Some(language) = passes_extension_filter(&entry.path) else {
                debug!(path = %entry.relative.display(), "unsupported file type");
                continue;
            };
            if let Some(langs) = &self.languages {
                if !langs.contains(&language) {
                    continue;
                }
            }

            files.push((entry.path, entry.relative));
        }

        Ok(files)
    }
}

/// A file that was walked but not summarized.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    /// Path relative to the scan root.
    pub path: PathBuf,
    pub reason: String,
}

/// Result of a summarization run.
#[derive(Debug)]
pub struct Summary {
    /// Root the run was started from.
    pub root: PathBuf,
    /// Extracted codemaps, in walk order.
    pub codemaps: Vec<Codemap>,
    /// Files that were skipped after the extension check.
    pub skipped: Vec<SkippedFile>,
    encoding: Encoding,
}

impl Summary {
    /// The full text summary.
    pub fn render_text(&self) -> String {
        let blocks: Vec<String> = self.codemaps.iter().map(render_codemap).collect();
        assemble(&blocks)
    }

    /// The JSON summary. Its token count describes the text summary.
    pub fn render_json(&self) -> Result<String, OutputError> {
        format_json(&self.codemaps, self.total_tokens())
    }

    /// Token count of the text summary.
    pub fn total_tokens(&self) -> usize {
        count_tokens(&self.render_text(), self.encoding)
    }

    /// Number of declarations across all files.
    pub fn declaration_count(&self) -> usize {
        self.codemaps.iter().map(|c| c.declarations.len()).sum()
    }

    /// Codemap for a path relative to the root.
    pub fn codemap_for(&self, path: &Path) -> Option<&Codemap> {
        self.codemaps.iter().find(|c| c.path == path)
    }
}

/// Read a source file and decide whether it can be summarized.
///
/// Applies the content filter (language, size, binary and minified checks)
/// and decodes the file as UTF-8, dropping a leading byte order mark.
pub fn read_source(path: &Path, max_size: u64) -> Result<(String, Language), CodemapError> {
    let read_failed = |source| CodemapError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };
    let rejected = |reason| CodemapError::Rejected {
        path: path.to_path_buf(),
        reason,
    };

    let size = std::fs::metadata(path).map_err(read_failed)?.len();
    if size > max_size {
        return Err(rejected(RejectReason::TooLarge));
    }

    let bytes = std::fs::read(path).map_err(read_failed)?;
    let language = match should_process(path, &bytes, size, max_size) {
        FilterResult::Accept(language) => language,
        FilterResult::Reject(reason) => return Err(rejected(reason)),
    };

    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());
    let text = std::str::from_utf8(body).map_err(|_| CodemapError::Decode {
        path: path.to_path_buf(),
    })?;
    Ok((text.to_string(), language))
}

// ============================================================================
// Functional API
// ============================================================================

/// Summarize a directory with default settings.
///
/// # Examples
///
/// ```no_run
/// use codesum::builder::summarize_path;
///
/// let summary = summarize_path("./project")?;
/// for codemap in &summary.codemaps {
///     println!("{}: {} declarations", codemap.display_path(), codemap.declarations.len());
/// }
/// # Ok::<(), codesum::CodesumError>(())
/// ```
pub fn summarize_path(root: impl AsRef<Path>) -> Result<Summary, CodesumError> {
    Summarizer::new(root.as_ref()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("web/node_modules/lib")).unwrap();
        fs::write(
            dir.path().join("src/app.py"),
            "import os\n\ndef add(a, b=2):\n    return a + b\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("src/User.cs"),
            "using System;\n\nnamespace App\n{\n    public class User\n    {\n        private int _count;\n    }\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("web/site.js"),
            "function toggleAdvancedSearch(event) {\n  return event;\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("web/node_modules/lib/index.js"),
            "function hidden() {}\n",
        )
        .unwrap();
        fs::write(dir.path().join("config.json"), "{\"key\": 1}\n").unwrap();

        dir
    }

    fn paths(summary: &Summary) -> Vec<String> {
        summary.codemaps.iter().map(|c| c.display_path()).collect()
    }

    #[test]
    fn test_summarizer_builds_in_walk_order() {
        let dir = create_test_project();
        let summary = Summarizer::new(dir.path()).build().unwrap();

        assert_eq!(paths(&summary), vec!["src/User.cs", "src/app.py", "web/site.js"]);
        assert!(summary.skipped.is_empty());
        assert_eq!(summary.declaration_count(), 5);
    }

    #[test]
    fn test_render_text() {
        let dir = create_test_project();
        let text = Summarizer::new(dir.path()).build().unwrap().render_text();

        assert!(text.starts_with("-- FILE: src/User.cs (C#) --\n  USINGS: System\n"));
        assert!(text.contains("\n      int _count;\n"));
        let python = "\n\n-- FILE: src/app.py (Python) --\n  IMPORT: import os\n  FUNC: add(a, b=2)\n";
        assert!(text.contains(python));
        assert!(text.contains("  FUNC: toggleAdvancedSearch(event)"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("config.json"));
        assert!(text.ends_with(")\n"));
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let dir = create_test_project();
        let first = summarize_path(dir.path()).unwrap().render_text();
        let second = summarize_path(dir.path()).unwrap().render_text();
        assert_eq!(first, second);
    }

    #[test]
    fn test_language_filter() {
        let dir = create_test_project();
        let summary = Summarizer::new(dir.path())
            .languages(&[Language::Python])
            .build()
            .unwrap();
        assert_eq!(paths(&summary), vec!["src/app.py"]);
    }

    #[test]
    fn test_exclude_and_default_excludes() {
        let dir = create_test_project();

        let summary = Summarizer::new(dir.path()).exclude_dirs(["web"]).build().unwrap();
        assert_eq!(paths(&summary), vec!["src/User.cs", "src/app.py"]);

        let summary = Summarizer::new(dir.path()).no_default_excludes().build().unwrap();
        assert!(paths(&summary).contains(&"web/node_modules/lib/index.js".to_string()));
    }

    #[test]
    fn test_walk_settings_reach_the_walker() {
        let dir = create_test_project();
        fs::create_dir_all(dir.path().join(".tools")).unwrap();
        fs::write(dir.path().join(".tools/gen.py"), "def gen():\n    pass\n").unwrap();
        fs::write(dir.path().join("top.py"), "def top():\n    pass\n").unwrap();
        let rules = dir.path().join("rules.ignore");
        fs::write(&rules, "site.js\n").unwrap();

        let summary = Summarizer::new(dir.path()).build().unwrap();
        assert!(paths(&summary).contains(&".tools/gen.py".to_string()));

        let summary = Summarizer::new(dir.path())
            .include_hidden(false)
            .ignore_files([&rules])
            .build()
            .unwrap();
        assert_eq!(paths(&summary), vec!["src/User.cs", "src/app.py", "top.py"]);

        let summary = Summarizer::new(dir.path()).max_depth(1).build().unwrap();
        assert_eq!(paths(&summary), vec!["top.py"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_follow_symlinks() {
        let dir = create_test_project();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("linked.py"), "def linked():\n    pass\n").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("shared")).unwrap();

        let summary = Summarizer::new(dir.path()).build().unwrap();
        assert!(!paths(&summary).contains(&"shared/linked.py".to_string()));

        let summary = Summarizer::new(dir.path()).follow_symlinks(true).build().unwrap();
        assert!(paths(&summary).contains(&"shared/linked.py".to_string()));
    }

    #[test]
    fn test_unreadable_files_are_skipped() {
        let dir = create_test_project();
        fs::write(dir.path().join("src/latin1.py"), b"name = '\xe9t\xe9'\n").unwrap();
        fs::write(dir.path().join("src/blob.cpp"), b"int x;\0\0\0").unwrap();

        let summary = summarize_path(dir.path()).unwrap();
        let skipped: Vec<String> = summary
            .skipped
            .iter()
            .map(|s| s.path.to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(skipped, vec!["src/blob.cpp", "src/latin1.py"]);
        assert_eq!(summary.codemaps.len(), 3);
    }

    #[test]
    fn test_missing_root() {
        let err = summarize_path("/nonexistent/codesum/root").unwrap_err();
        assert!(matches!(err, CodesumError::PathNotFound(_)));
    }

    #[test]
    fn test_json_summary() {
        let dir = create_test_project();
        let summary = summarize_path(dir.path()).unwrap();
        let rendered = summary.render_json().unwrap();
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(json["summary"]["files"], 3);
        assert_eq!(json["summary"]["tokens"], summary.total_tokens());
        assert_eq!(json["files"][1]["declarations"][0]["name"], "add");
    }

    #[test]
    fn test_read_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.cs");
        fs::write(&path, b"\xEF\xBB\xBFclass A { }\n").unwrap();
        let (text, language) = read_source(&path, DEFAULT_MAX_FILE_SIZE).unwrap();
        assert_eq!(text, "class A { }\n");
        assert_eq!(language, Language::CSharp);

        let err = read_source(&path, 4).unwrap_err();
        assert!(matches!(
            err,
            CodemapError::Rejected {
                reason: RejectReason::TooLarge,
                ..
            }
        ));

        let err = read_source(&dir.path().join("missing.py"), DEFAULT_MAX_FILE_SIZE).unwrap_err();
        assert!(matches!(err, CodemapError::ReadFailed { .. }));
    }

    #[test]
    fn test_codemap_lookup() {
        let dir = create_test_project();
        let summary = summarize_path(dir.path()).unwrap();
        let codemap = summary.codemap_for(Path::new("web/site.js")).unwrap();
        assert_eq!(codemap.language, Language::JavaScript);
        assert_eq!(summary.root, dir.path());
    }
}
