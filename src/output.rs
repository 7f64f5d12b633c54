//! Summary rendering and writing.
//!
//! Each codemap becomes one file block: a header line followed by its
//! imports and declarations, indented two spaces per nesting level. C# and
//! Razor files read like trimmed-down source; the other languages use
//! `KIND: signature` lines. Blocks are joined into one document, which is
//! written atomically.

use std::io::Write as _;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::codemap::{Codemap, DeclKind, Declaration, UNKNOWN_TYPE};
use crate::filter::Language;

/// Errors that can occur while producing or writing output.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to replace output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented plain-text summary (default).
    #[default]
    Text,
    /// JSON for programmatic access.
    Json,
}

// ============================================================================
// Text rendering
// ============================================================================

/// Header line of a file block.
pub fn file_header(codemap: &Codemap) -> String {
    format!("-- FILE: {} ({}) --", codemap.display_path(), codemap.language)
}

/// Render one codemap as a file block (no trailing newline).
pub fn render_codemap(codemap: &Codemap) -> String {
    let mut lines = vec![file_header(codemap)];
    let top = indent(0);

    for directive in &codemap.directives {
        lines.push(format!("{top}DIRECTIVE: {directive}"));
    }

    if !codemap.imports.is_empty() {
        match codemap.language {
            Language::CSharp | Language::Cshtml => {
                lines.push(format!("{top}USINGS: {}", codemap.imports.join(", ")));
            }
            Language::Cpp => {
                lines.push(format!("{top}INCLUDES: {}", codemap.imports.join(", ")));
            }
            Language::Python | Language::JavaScript => {
                lines.extend(codemap.imports.iter().map(|i| format!("{top}IMPORT: {i}")));
            }
        }
    }

    for decl in &codemap.declarations {
        let text = match codemap.language {
            Language::CSharp | Language::Cshtml => csharp_line(decl),
            Language::Cpp => cpp_line(decl),
            Language::Python => python_line(decl),
            Language::JavaScript => javascript_line(decl),
        };
        lines.push(format!("{}{text}", indent(decl.depth)));
    }

    lines.join("\n")
}

/// Join file blocks with one blank line between them.
///
/// The result ends with a single newline, or is empty when there are no
/// blocks.
pub fn assemble<S: AsRef<str>>(blocks: &[S]) -> String {
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks
        .iter()
        .map(|b| b.as_ref().trim_end_matches('\n'))
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth + 1)
}

fn param_list(decl: &Declaration) -> String {
    let params = decl.params.as_ref().map(|p| p.join(", ")).unwrap_or_default();
    format!("({params})")
}

fn type_or_unknown(decl: &Declaration) -> &str {
    decl.ty.as_deref().unwrap_or(UNKNOWN_TYPE)
}

/// `prefix ` when present, nothing otherwise.
fn spaced(prefix: Option<&str>) -> String {
    prefix.map(|p| format!("{p} ")).unwrap_or_default()
}

fn csharp_line(decl: &Declaration) -> String {
    let name = &decl.name;
    match decl.kind {
        DeclKind::Namespace => format!("namespace {name}"),
        kind if kind.is_container() => match &decl.extends {
            Some(base) => format!("{} {name} : {base}", kind.keyword()),
            None => format!("{} {name}", kind.keyword()),
        },
        DeclKind::Field => format!("{} {name};", type_or_unknown(decl)),
        DeclKind::Property => format!(
            "{} {name} {}",
            type_or_unknown(decl),
            decl.qualifier.as_deref().unwrap_or("{ get; }")
        ),
        DeclKind::Event => format!("event {} {name};", type_or_unknown(decl)),
        DeclKind::Delegate => format!(
            "delegate {}{name}{};",
            spaced(decl.ty.as_deref()),
            param_list(decl)
        ),
        DeclKind::Method => format!("{}{name}{}", spaced(decl.ty.as_deref()), param_list(decl)),
        DeclKind::Constructor | DeclKind::Destructor => format!("{name}{}", param_list(decl)),
        // Script blocks in Razor views.
        DeclKind::Function => format!(
            "function {}{name}{}",
            spaced(decl.qualifier.as_deref()),
            param_list(decl)
        ),
        DeclKind::Variable => format!("{} {name};", decl.qualifier.as_deref().unwrap_or("var")),
        _ => format!("{} {name}", decl.kind.keyword()),
    }
}

fn cpp_line(decl: &Declaration) -> String {
    let tag = decl.kind.tag();
    let name = &decl.name;
    match decl.kind {
        DeclKind::Namespace | DeclKind::Enum => format!("{tag}: {name}"),
        kind if kind.is_container() => match &decl.extends {
            Some(base) => format!("{tag}: {name} : {base}"),
            None => format!("{tag}: {name}"),
        },
        DeclKind::Field => format!("{tag}: {} {name}", type_or_unknown(decl)),
        DeclKind::ForwardDecl => format!("{tag}: {}{name}", spaced(decl.qualifier.as_deref())),
        DeclKind::Constructor | DeclKind::Destructor => {
            format!("{tag}: {name}{}", param_list(decl))
        }
        kind if kind.is_callable() => {
            let mut line = format!(
                "{tag}: {}{name}{}",
                spaced(decl.ty.as_deref()),
                param_list(decl)
            );
            if let Some(qualifier) = &decl.qualifier {
                line.push(' ');
                line.push_str(qualifier);
            }
            line
        }
        _ => format!("{tag}: {name}"),
    }
}

fn python_line(decl: &Declaration) -> String {
    let tag = decl.kind.tag();
    let name = &decl.name;
    match decl.kind {
        DeclKind::Decorator => format!("{tag}: @{name}"),
        DeclKind::Field => format!("{tag}: {name}: {}", type_or_unknown(decl)),
        kind if kind.is_container() => match &decl.extends {
            Some(bases) => format!("{tag}: {name}({bases})"),
            None => format!("{tag}: {name}"),
        },
        kind if kind.is_callable() => {
            let mut line = format!(
                "{tag}: {}{name}{}",
                spaced(decl.qualifier.as_deref()),
                param_list(decl)
            );
            if let Some(ret) = &decl.ty {
                line.push_str(" -> ");
                line.push_str(ret);
            }
            line
        }
        _ => format!("{tag}: {name}"),
    }
}

fn javascript_line(decl: &Declaration) -> String {
    let tag = decl.kind.tag();
    let name = &decl.name;
    let qualifier = spaced(decl.qualifier.as_deref());
    match decl.kind {
        DeclKind::Variable => format!(
            "{tag} ({}): {name}",
            decl.qualifier.as_deref().unwrap_or("var").to_uppercase()
        ),
        kind if kind.is_container() => match &decl.extends {
            Some(base) => format!("{tag}: {name} extends {base}"),
            None => format!("{tag}: {name}"),
        },
        DeclKind::Field => format!("{tag}: {qualifier}{name}"),
        _ if decl.params.is_some() => format!("{tag}: {qualifier}{name}{}", param_list(decl)),
        _ => format!("{tag}: {qualifier}{name}"),
    }
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize)]
struct JsonReport<'a> {
    files: &'a [Codemap],
    summary: JsonSummary,
}

#[derive(Serialize)]
struct JsonSummary {
    files: usize,
    declarations: usize,
    tokens: usize,
}

/// Render codemaps as a pretty-printed JSON document.
///
/// `tokens` is the token count of the matching text summary.
pub fn format_json(codemaps: &[Codemap], tokens: usize) -> Result<String, OutputError> {
    let report = JsonReport {
        files: codemaps,
        summary: JsonSummary {
            files: codemaps.len(),
            declarations: codemaps.iter().map(|c| c.declarations.len()).sum(),
            tokens,
        },
    };
    let mut json = serde_json::to_string_pretty(&report)?;
    json.push('\n');
    Ok(json)
}

// ============================================================================
// Writing
// ============================================================================

/// Write `contents` to `path`, replacing any existing file.
///
/// Missing parent directories are created. The data goes to a temporary
/// file next to the destination first and is renamed into place, so readers
/// never see a partial summary.
pub fn write_summary(path: &Path, contents: &str) -> Result<(), OutputError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemap::{extract_codemap, Params};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn params(list: &[&str]) -> Params {
        list.iter().map(|p| p.to_string()).collect()
    }

    fn codemap(language: Language, declarations: Vec<Declaration>) -> Codemap {
        Codemap {
            declarations,
            ..Codemap::empty(PathBuf::from("src/sample"), language)
        }
    }

    #[test]
    fn test_header() {
        let map = Codemap::empty(PathBuf::from("src\\app\\main.py"), Language::Python);
        assert_eq!(render_codemap(&map), "-- FILE: src/app/main.py (Python) --");
    }

    #[test]
    fn test_csharp_block() {
        let mut map = codemap(
            Language::CSharp,
            vec![
                Declaration::new(DeclKind::Namespace, "App", 0, 3),
                Declaration::new(DeclKind::Class, "User", 1, 5).with_extends(Some("Base".into())),
                Declaration::new(DeclKind::Field, "_count", 2, 7).with_type("int"),
                Declaration::new(DeclKind::Property, "Name", 2, 8)
                    .with_type("string")
                    .with_qualifier("{ get; set; }"),
                Declaration::new(DeclKind::Event, "Changed", 2, 9).with_type("EventHandler"),
                Declaration::new(DeclKind::Delegate, "Op", 2, 10)
                    .with_type("int")
                    .with_params(params(&["int a"])),
                Declaration::new(DeclKind::Constructor, "User", 2, 11)
                    .with_params(params(&["string name"])),
                Declaration::new(DeclKind::Destructor, "~User", 2, 12).with_params(Params::new()),
                Declaration::new(DeclKind::Method, "Save", 2, 13)
                    .with_type("void")
                    .with_params(params(&["bool force = false"])),
            ],
        );
        map.imports = vec!["System".into(), "System.Linq".into()];

        let expected = "\
-- FILE: src/sample (C#) --
  USINGS: System, System.Linq
  namespace App
    class User : Base
      int _count;
      string Name { get; set; }
      event EventHandler Changed;
      delegate int Op(int a);
      User(string name)
      ~User()
      void Save(bool force = false)";
        assert_eq!(render_codemap(&map), expected);
    }

    #[test]
    fn test_cshtml_directives() {
        let mut map = codemap(
            Language::Cshtml,
            vec![Declaration::new(DeclKind::Field, "count", 0, 9).with_type("int")],
        );
        map.directives = vec!["@model CounterModel".into()];
        map.imports = vec!["System.Linq".into()];
        assert_eq!(
            render_codemap(&map),
            "-- FILE: src/sample (CSHTML) --\n  DIRECTIVE: @model CounterModel\n  USINGS: System.Linq\n  int count;"
        );
    }

    #[test]
    fn test_cpp_block() {
        let mut map = codemap(
            Language::Cpp,
            vec![
                Declaration::new(DeclKind::Namespace, "geo", 0, 3),
                Declaration::new(DeclKind::Class, "Shape", 1, 4)
                    .with_extends(Some("public Base".into())),
                Declaration::new(DeclKind::Field, "x", 2, 6).with_type("int"),
                Declaration::new(DeclKind::Field, "cb", 2, 7).with_type(UNKNOWN_TYPE),
                Declaration::new(DeclKind::Constructor, "Shape", 2, 8)
                    .with_params(params(&["int x"])),
                Declaration::new(DeclKind::Method, "area", 2, 9)
                    .with_type("double")
                    .with_params(Params::new())
                    .with_qualifier("const = 0"),
                Declaration::new(DeclKind::Function, "add", 0, 12)
                    .with_type("int")
                    .with_params(params(&["int a", "int b"])),
                Declaration::new(DeclKind::ForwardDecl, "Node", 0, 14).with_qualifier("struct"),
            ],
        );
        map.imports = vec!["<vector>".into(), "\"shape.h\"".into()];

        let expected = "\
-- FILE: src/sample (C/C++) --
  INCLUDES: <vector>, \"shape.h\"
  NAMESPACE: geo
    CLASS: Shape : public Base
      FIELD: int x
      FIELD: unknown cb
      CONSTRUCTOR: Shape(int x)
      METHOD: double area() const = 0
  FUNC: int add(int a, int b)
  FORWARD_DECL: struct Node";
        assert_eq!(render_codemap(&map), expected);
    }

    #[test]
    fn test_python_block() {
        let code = "import os\n\n@dataclass\nclass Point(Base):\n    x: int = 0\n    label = 'p'\n\n    async def move(self, dx=1) -> None:\n        pass\n\ndef add(a, b=2):\n    return a + b\n";
        let map = extract_codemap(Path::new("geo/point.py"), code, Language::Python);
        let expected = "\
-- FILE: geo/point.py (Python) --
  IMPORT: import os
  DECORATOR: @dataclass
  CLASS: Point(Base)
    FIELD: x: int
    FIELD: label: unknown
    METHOD: async move(self, dx=1) -> None
  FUNC: add(a, b=2)";
        assert_eq!(render_codemap(&map), expected);
    }

    #[test]
    fn test_javascript_block() {
        let code = "import x from './x';\nexport class Widget extends Base {\n  static count = 0;\n  constructor(props) { super(props); }\n  get label() { return 1; }\n  static async load(id) { }\n}\nfunction toggleAdvancedSearch(event) { }\nconst MAX = 3;\n";
        let map = extract_codemap(Path::new("ui.js"), code, Language::JavaScript);
        let expected = "\
-- FILE: ui.js (JavaScript) --
  IMPORT: import x from './x'
  CLASS: Widget extends Base
    FIELD: static count
    CONSTRUCTOR: constructor(props)
    PROPERTY: get label()
    METHOD: static async load(id)
  FUNC: toggleAdvancedSearch(event)
  VARIABLE (CONST): MAX";
        assert_eq!(render_codemap(&map), expected);
    }

    #[test]
    fn test_empty_file_keeps_header() {
        let map = extract_codemap(Path::new("empty.cs"), "", Language::CSharp);
        assert_eq!(render_codemap(&map), "-- FILE: empty.cs (C#) --");
    }

    #[test]
    fn test_assemble() {
        assert_eq!(assemble::<String>(&[]), "");
        assert_eq!(assemble(&["-- FILE: a --"]), "-- FILE: a --\n");
        assert_eq!(
            assemble(&["-- FILE: a --\n  x", "-- FILE: b --\n"]),
            "-- FILE: a --\n  x\n\n-- FILE: b --\n"
        );
    }

    #[test]
    fn test_json_report() {
        let map = codemap(
            Language::Python,
            vec![Declaration::new(DeclKind::Function, "add", 0, 1)
                .with_params(params(&["a", "b=2"]))],
        );
        let json = format_json(&[map], 12).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["files"], 1);
        assert_eq!(value["summary"]["declarations"], 1);
        assert_eq!(value["summary"]["tokens"], 12);
        let decl = &value["files"][0]["declarations"][0];
        assert_eq!(decl["kind"], "function");
        assert_eq!(decl["params"][1], "b=2");
        assert!(decl.get("type").is_none());
    }

    #[test]
    fn test_write_summary_creates_parents_and_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/summary.txt");

        write_summary(&path, "first\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\n");

        write_summary(&path, "second\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second\n");

        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
