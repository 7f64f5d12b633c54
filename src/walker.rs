//! Directory traversal with exclusion filtering.
//!
//! Uses the `ignore` crate to walk the scan root in a deterministic order.
//! Directories whose name matches an exclusion pattern are pruned before
//! they are entered. `.gitignore` files are only honoured on request; a
//! `.codesumignore` file in the root always is.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use thiserror::Error;

/// Directory names skipped unless defaults are turned off.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] =
    &["venv", ".git", "obj", "bin", ".vs", "node_modules", "tmp", "temp"];

/// Ignore file read from the scan root.
pub const IGNORE_FILE: &str = ".codesumignore";

/// Errors that can occur during directory walking.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("symlink loop detected: {path}")]
    SymlinkLoop { path: PathBuf },

    #[error("invalid exclude pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    /// Follow symbolic links.
    pub follow_symlinks: bool,
    /// Include hidden files and directories.
    pub include_hidden: bool,
    /// Respect .gitignore patterns.
    pub respect_gitignore: bool,
    /// Additional ignore files in gitignore syntax.
    pub custom_ignores: Vec<PathBuf>,
    /// Directory name patterns to prune (glob syntax).
    pub excluded_dirs: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            follow_symlinks: false,
            include_hidden: true,
            respect_gitignore: false,
            custom_ignores: Vec::new(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl WalkOptions {
    /// Add directory patterns to the exclusion set.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_dirs.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Drop the default exclusion set.
    pub fn without_default_excludes(mut self) -> Self {
        self.excluded_dirs
            .retain(|d| !DEFAULT_EXCLUDED_DIRS.contains(&d.as_str()));
        self
    }

    /// Set maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }
}

/// A file found by the walk.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Path to the file.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative: PathBuf,
}

/// Walk `root` and yield every file outside excluded directories.
///
/// Files come out sorted by name within each directory, so two walks over
/// the same tree agree. The root itself must be an existing directory;
/// errors on individual entries are yielded and the walk continues.
///
/// # Examples
///
/// ```no_run
/// use codesum::walker::{walk_files, WalkOptions};
/// use std::path::Path;
///
/// for entry in walk_files(Path::new("."), &WalkOptions::default())?.flatten() {
///     println!("{}", entry.relative.display());
/// }
/// # Ok::<(), codesum::walker::WalkError>(())
/// ```
pub fn walk_files(
    root: &Path,
    options: &WalkOptions,
) -> Result<impl Iterator<Item = Result<WalkEntry, WalkError>>, WalkError> {
    check_root(root)?;
    let patterns = compile_patterns(&options.excluded_dirs)?;

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(!options.include_hidden)
        .ignore(options.respect_gitignore)
        .parents(options.respect_gitignore)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .follow_links(options.follow_symlinks)
        .max_depth(options.max_depth)
        .sort_by_file_name(|a, b| a.cmp(b));

    for ignore_path in &options.custom_ignores {
        if ignore_path.exists() {
            builder.add_ignore(ignore_path);
        }
    }
    let root_ignore = root.join(IGNORE_FILE);
    if root_ignore.exists() {
        builder.add_ignore(&root_ignore);
    }

    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        if !is_dir || entry.depth() == 0 {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !patterns.iter().any(|p| p.matches(&name))
    });

    let root = root.to_path_buf();
    Ok(builder.build().filter_map(move |result| match result {
        Ok(entry) => {
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                return None;
            }
            let path = entry.path().to_path_buf();
            let relative = path.strip_prefix(&root).unwrap_or(path.as_path()).to_path_buf();
            Some(Ok(WalkEntry { path, relative }))
        }
        Err(err) => convert_error(err, None),
    }))
}

fn check_root(root: &Path) -> Result<(), WalkError> {
    let metadata = root.metadata().map_err(|e| {
        let path = root.to_path_buf();
        match e.kind() {
            std::io::ErrorKind::NotFound => WalkError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => WalkError::PermissionDenied { path },
            _ => WalkError::Io { path, source: e },
        }
    })?;
    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>, WalkError> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|source| WalkError::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Convert a walk error, keeping the innermost path. Errors that are not
/// about the filesystem (bad ignore-file lines) are dropped.
fn convert_error(
    err: ignore::Error,
    path: Option<PathBuf>,
) -> Option<Result<WalkEntry, WalkError>> {
    match err {
        ignore::Error::WithPath { path, err } => convert_error(*err, Some(path)),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            convert_error(*err, path)
        }
        ignore::Error::Loop { child, .. } => Some(Err(WalkError::SymlinkLoop { path: child })),
        ignore::Error::Io(source) => {
            let path = path.unwrap_or_default();
            if source.kind() == std::io::ErrorKind::PermissionDenied {
                Some(Err(WalkError::PermissionDenied { path }))
            } else {
                Some(Err(WalkError::Io { path, source }))
            }
        }
        _ => None,
    }
}
