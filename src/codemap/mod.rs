//! Heuristic declaration extraction.
//!
//! Each supported language has a scanner that reads raw source text and
//! returns the declarations it recognizes, in source order, with their
//! nesting depth. The scanners never fail: unfamiliar syntax is skipped and
//! types that cannot be read are reported as [`UNKNOWN_TYPE`].

mod cpp;
mod csharp;
mod cshtml;
mod javascript;
mod python;
mod scan;

use std::path::{Path, PathBuf};

use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;

use crate::filter::{Language, RejectReason};

/// Placeholder type for fields whose type could not be determined.
pub const UNKNOWN_TYPE: &str = "unknown";

/// Kind of an extracted declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Namespace,
    Class,
    Struct,
    Interface,
    Enum,
    Record,
    Union,
    Field,
    Property,
    Event,
    Method,
    Function,
    Constructor,
    Destructor,
    Delegate,
    Variable,
    Decorator,
    /// `class Name;` without a body.
    ForwardDecl,
}

impl DeclKind {
    /// Whether declarations of this kind contain other declarations.
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            DeclKind::Namespace
                | DeclKind::Class
                | DeclKind::Struct
                | DeclKind::Interface
                | DeclKind::Enum
                | DeclKind::Record
                | DeclKind::Union
        )
    }

    /// Whether declarations of this kind carry a parameter list.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            DeclKind::Method
                | DeclKind::Function
                | DeclKind::Constructor
                | DeclKind::Destructor
                | DeclKind::Delegate
        )
    }

    /// Source keyword for type-like declarations (`class`, `struct`, ...).
    pub fn keyword(&self) -> &'static str {
        match self {
            DeclKind::Namespace => "namespace",
            DeclKind::Class => "class",
            DeclKind::Struct => "struct",
            DeclKind::Interface => "interface",
            DeclKind::Enum => "enum",
            DeclKind::Record => "record",
            DeclKind::Union => "union",
            DeclKind::Field => "field",
            DeclKind::Property => "property",
            DeclKind::Event => "event",
            DeclKind::Method => "method",
            DeclKind::Function => "function",
            DeclKind::Constructor => "constructor",
            DeclKind::Destructor => "destructor",
            DeclKind::Delegate => "delegate",
            DeclKind::Variable => "variable",
            DeclKind::Decorator => "decorator",
            DeclKind::ForwardDecl => "forward",
        }
    }

    /// Tag used in tagged (non-C#) summaries.
    pub fn tag(&self) -> &'static str {
        match self {
            DeclKind::Namespace => "NAMESPACE",
            DeclKind::Class => "CLASS",
            DeclKind::Struct => "STRUCT",
            DeclKind::Interface => "INTERFACE",
            DeclKind::Enum => "ENUM",
            DeclKind::Record => "RECORD",
            DeclKind::Union => "UNION",
            DeclKind::Field => "FIELD",
            DeclKind::Property => "PROPERTY",
            DeclKind::Event => "EVENT",
            DeclKind::Method => "METHOD",
            DeclKind::Function => "FUNC",
            DeclKind::Constructor => "CONSTRUCTOR",
            DeclKind::Destructor => "DESTRUCTOR",
            DeclKind::Delegate => "DELEGATE",
            DeclKind::Variable => "VARIABLE",
            DeclKind::Decorator => "DECORATOR",
            DeclKind::ForwardDecl => "FORWARD_DECL",
        }
    }
}

/// Ordered parameter strings, verbatim apart from collapsed whitespace.
pub type Params = SmallVec<[String; 4]>;

/// A declaration extracted from source code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub kind: DeclKind,
    pub name: String,
    /// Parameter list for callables; `None` for everything else.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Field/property type, or return type where the language states one.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    /// Base list of a type declaration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Extra keyword shown with the declaration (`async`, `get`, `const`...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Number of enclosing declarations.
    pub depth: usize,
    /// 1-indexed line where the declaration starts.
    pub line: usize,
}

impl Declaration {
    pub fn new(kind: DeclKind, name: impl Into<String>, depth: usize, line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            params: None,
            ty: None,
            extends: None,
            qualifier: None,
            depth,
            line,
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_type(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn with_extends(mut self, extends: Option<String>) -> Self {
        self.extends = extends.filter(|e| !e.is_empty());
        self
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// True when the type could not be read from the source.
    pub fn has_unknown_type(&self) -> bool {
        self.ty.as_deref() == Some(UNKNOWN_TYPE)
    }
}

/// Everything an extractor finds in one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Deduplicated imports in first-seen order.
    pub imports: Vec<String>,
    /// CSHTML directives (`@model`, `@page`, ...).
    pub directives: Vec<String>,
    pub declarations: Vec<Declaration>,
}

impl Extraction {
    /// Record an import unless it was already seen.
    pub(crate) fn add_import(&mut self, import: impl Into<String>) {
        let import = import.into();
        if !import.is_empty() && !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }
}

/// The extracted summary of one source file.
#[derive(Debug, Clone, Serialize)]
pub struct Codemap {
    /// Path relative to the scan root.
    pub path: PathBuf,
    pub language: Language,
    pub imports: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<String>,
    pub declarations: Vec<Declaration>,
    /// Line count of the source file.
    pub lines: usize,
}

impl Codemap {
    /// Create an empty codemap for a file.
    pub fn empty(path: PathBuf, language: Language) -> Self {
        Self {
            path,
            language,
            imports: Vec::new(),
            directives: Vec::new(),
            declarations: Vec::new(),
            lines: 0,
        }
    }

    /// Path rendered with `/` separators regardless of platform.
    pub fn display_path(&self) -> String {
        self.path.to_string_lossy().replace('\\', "/")
    }

    /// Whether nothing at all was found in the file.
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.directives.is_empty() && self.declarations.is_empty()
    }
}

/// Per-file failures. None of these abort a run.
#[derive(Debug, Error)]
pub enum CodemapError {
    #[error("failed to read file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file is not valid UTF-8: {path}")]
    Decode { path: PathBuf },

    #[error("skipped {path}: {reason}")]
    Rejected { path: PathBuf, reason: RejectReason },
}

/// Run the extractor for `language` over `content`.
pub fn extract(content: &str, language: Language) -> Extraction {
    match language {
        Language::Cpp => cpp::extract(content),
        Language::CSharp => csharp::extract(content),
        Language::Python => python::extract(content),
        Language::JavaScript => javascript::extract(content),
        Language::Cshtml => cshtml::extract(content),
    }
}

/// Extract a codemap from a source file's content.
///
/// `path` is stored as given; callers pass the path relative to the scan
/// root so it can be printed directly.
pub fn extract_codemap(path: &Path, content: &str, language: Language) -> Codemap {
    let extraction = extract(content, language);

    Codemap {
        path: path.to_path_buf(),
        language,
        imports: extraction.imports,
        directives: extraction.directives,
        declarations: extraction.declarations,
        lines: scan::line_count(content),
    }
}
