//! Python declaration scanner.
//!
//! Works on logical lines: physical lines are joined while brackets are
//! open, after a trailing backslash, or while a triple-quoted string runs
//! on. Nesting comes from an indentation stack of open `class` and `def`
//! blocks.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::scan::{self, LineIndex, Masked, MaskStyle, Snippet};
use super::{DeclKind, Declaration, Extraction, UNKNOWN_TYPE};

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:import\s|from\s+[\w.]+\s+import\b)").expect("import regex is invalid")
});

static DECORATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@\s*([A-Za-z_][\w.]*)").expect("decorator regex is invalid"));

static DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(async\s+)?def\s+([A-Za-z_]\w*)\s*\(").expect("def regex is invalid")
});

static CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)").expect("class regex is invalid"));

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*(:|=)").expect("field regex is invalid"));

/// Statement keywords that can be followed directly by `:`.
const KEYWORDS: &[&str] = &[
    "else", "try", "finally", "except", "lambda", "pass", "return", "yield", "raise", "del",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenKind {
    Class,
    Def,
}

/// A `class` or `def` whose body is still being read.
struct Open {
    indent: usize,
    kind: OpenKind,
    /// Indentation of the first statement in the body.
    body_indent: Option<usize>,
}

/// Extract imports and declarations from a Python file.
pub fn extract(content: &str) -> Extraction {
    let masked = scan::mask(content, MaskStyle::PYTHON);
    let lines = LineIndex::new(content);
    let mut out = Extraction::default();
    let mut stack: Vec<Open> = Vec::new();

    for range in logical_lines(&masked, &lines) {
        let line = Snippet::new(content, &masked.text, &lines, range);
        if line.is_blank() {
            continue;
        }

        let indent = indent_width(line.masked());
        while stack.last().is_some_and(|open| open.indent >= indent) {
            stack.pop();
        }
        if let Some(open) = stack.last_mut() {
            open.body_indent.get_or_insert(indent);
        }

        let depth = stack.len();
        let parent = stack.last().map(|open| open.kind);
        let at_class_body = stack
            .last()
            .is_some_and(|open| open.kind == OpenKind::Class && open.body_indent == Some(indent));

        let masked_line = line.masked();
        let stmt = line.after(masked_line.len() - masked_line.trim_start().len());
        let text = stmt.masked();

        if IMPORT.is_match(text) {
            let end = text.trim_end().len();
            out.add_import(import_text(&stmt.original()[..end]));
        } else if let Some(caps) = DECORATOR.captures(text) {
            let decl = Declaration::new(DeclKind::Decorator, &caps[1], depth, stmt.line());
            out.declarations.push(decl);
        } else if let Some(caps) = DEF.captures(text) {
            let in_class = parent == Some(OpenKind::Class);
            out.declarations.push(function(stmt, &caps, in_class, depth));
            stack.push(Open {
                indent,
                kind: OpenKind::Def,
                body_indent: None,
            });
        } else if let Some(caps) = CLASS.captures(text) {
            out.declarations.push(class(stmt, &caps, depth));
            stack.push(Open {
                indent,
                kind: OpenKind::Class,
                body_indent: None,
            });
        } else if at_class_body {
            if let Some(decl) = field(stmt, depth) {
                out.declarations.push(decl);
            }
        }
    }

    out
}

/// Byte ranges of logical lines in the masked text.
fn logical_lines(masked: &Masked, lines: &LineIndex) -> Vec<Range<usize>> {
    let text = &masked.text;
    let physical = lines.ranges(text.len());
    let mut logical = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;

    for (i, line) in physical.iter().enumerate() {
        let begin = *start.get_or_insert(line.start);
        let body = &text[line.clone()];
        for b in body.bytes() {
            match b {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }

        let continued = depth > 0
            || body.trim_end().ends_with('\\')
            || physical
                .get(i + 1)
                .is_some_and(|next| inside_literal(&masked.multiline_literals, next.start));
        if !continued {
            logical.push(begin..line.end);
            start = None;
        }
    }

    if let Some(begin) = start {
        logical.push(begin..text.len());
    }
    logical
}

fn inside_literal(literals: &[Range<usize>], offset: usize) -> bool {
    literals.iter().any(|r| r.start < offset && offset < r.end)
}

/// Leading whitespace width, with tabs advancing to the next multiple of 8.
fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for b in line.bytes() {
        match b {
            b' ' => width += 1,
            b'\t' => width = width / 8 * 8 + 8,
            _ => break,
        }
    }
    width
}

/// Import statement with whitespace collapsed and line continuations and
/// grouping parens removed.
fn import_text(raw: &str) -> String {
    let text = scan::squash(&raw.replace('\\', " "));
    match (text.find('('), text.rfind(')')) {
        (Some(open), Some(close)) if open < close => {
            let names: Vec<&str> = text[open + 1..close]
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect();
            format!("{}{}", &text[..open], names.join(", "))
        }
        _ => text,
    }
}

fn function(
    stmt: Snippet<'_>,
    caps: &regex::Captures<'_>,
    in_class: bool,
    depth: usize,
) -> Declaration {
    let masked = stmt.masked();
    let name = caps.get(2).map_or("", |m| m.as_str());
    let open = caps.get(0).map_or(0, |m| m.end() - 1);
    let close = scan::matching_close(masked, open, b'(', b')').unwrap_or(masked.len());

    let kind = match (in_class, name) {
        (true, "__init__") => DeclKind::Constructor,
        (true, _) => DeclKind::Method,
        (false, _) => DeclKind::Function,
    };

    let mut decl = Declaration::new(kind, name, depth, stmt.line())
        .with_params(scan::params(stmt, open, close, false));
    if let Some(ty) = return_annotation(stmt, close) {
        decl = decl.with_type(ty);
    }
    if caps.get(1).is_some() {
        decl = decl.with_qualifier("async");
    }
    decl
}

/// Text between `->` and the colon that ends the `def` header.
fn return_annotation(stmt: Snippet<'_>, close: usize) -> Option<String> {
    let masked = stmt.masked();
    let after = (close + 1).min(masked.len());
    let tail = &masked[after..];
    let colon = scan::find_top_level(tail, false, |b, i| b[i] == b':').unwrap_or(tail.len());
    let arrow = tail[..colon].find("->")?;
    let ty = scan::squash(&stmt.original()[after + arrow + 2..after + colon]);
    (!ty.is_empty()).then_some(ty)
}

fn class(stmt: Snippet<'_>, caps: &regex::Captures<'_>, depth: usize) -> Declaration {
    let masked = stmt.masked();
    let name = caps.get(1).map_or("", |m| m.as_str());
    let after = caps.get(0).map_or(masked.len(), |m| m.end());
    let tail = &masked[after..];
    let colon = scan::find_top_level(tail, false, |b, i| b[i] == b':').unwrap_or(tail.len());

    let extends = scan::find_top_level(&tail[..colon], false, scan::is_open_paren).and_then(|open| {
        let open = after + open;
        let close = scan::matching_close(masked, open, b'(', b')')?;
        Some(scan::squash(&stmt.original()[open + 1..close]))
    });

    Declaration::new(DeclKind::Class, name, depth, stmt.line()).with_extends(extends)
}

/// `name: T = v` or `name = v` directly in a class body.
fn field(stmt: Snippet<'_>, depth: usize) -> Option<Declaration> {
    let masked = stmt.masked();
    let caps = FIELD.captures(masked)?;
    let name = caps.get(1)?.as_str();
    if KEYWORDS.contains(&name) {
        return None;
    }

    let sep = caps.get(2)?;
    let tail = &masked[sep.end()..];
    let ty = if sep.as_str() == "=" {
        if tail.starts_with('=') {
            return None;
        }
        UNKNOWN_TYPE.to_string()
    } else {
        let end = scan::find_top_level(tail, false, scan::is_assign).unwrap_or(tail.len());
        let ty = scan::squash(&stmt.original()[sep.end()..sep.end() + end]);
        if ty.is_empty() {
            return None;
        }
        ty
    };

    Some(Declaration::new(DeclKind::Field, name, depth, stmt.line()).with_type(ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(decl: &Declaration) -> Vec<&str> {
        decl.params
            .as_ref()
            .map(|p| p.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_function_with_default() {
        let out = extract("def add(a, b=2):\n    return a + b\n");
        assert_eq!(out.declarations.len(), 1);
        let decl = &out.declarations[0];
        assert_eq!(decl.kind, DeclKind::Function);
        assert_eq!(decl.name, "add");
        assert_eq!(params(decl), vec!["a", "b=2"]);
        assert_eq!(decl.depth, 0);
        assert_eq!(decl.line, 1);
    }

    #[test]
    fn test_imports() {
        let code = "import os\nfrom typing import (\n    Dict,\n    List,\n)\nimport os  # again\nfrom . import sibling\n";
        let out = extract(code);
        assert_eq!(
            out.imports,
            vec!["import os", "from typing import Dict, List", "from . import sibling"]
        );
        assert!(out.declarations.is_empty());
    }

    #[test]
    fn test_class_members() {
        let code = r#"@dataclass
class Point(Base, metaclass=Meta):
    """A point.

def fake(): pass
"""
    x: int = 0
    y: Dict[str, int]
    label = "p"

    def __init__(self, x, y=2):
        self.x = x

    @property
    def norm(self) -> float:
        return 0.0

    async def fetch(self, url: str, *, timeout: float = 1.0) -> Dict[str, List[int]]:
        def helper(a):
            return a
        return {}


def add(a, b=2):
    return a + b
"#;
        let decls = extract(code).declarations;
        let summary: Vec<(DeclKind, &str, usize)> =
            decls.iter().map(|d| (d.kind, d.name.as_str(), d.depth)).collect();
        assert_eq!(
            summary,
            vec![
                (DeclKind::Decorator, "dataclass", 0),
                (DeclKind::Class, "Point", 0),
                (DeclKind::Field, "x", 1),
                (DeclKind::Field, "y", 1),
                (DeclKind::Field, "label", 1),
                (DeclKind::Constructor, "__init__", 1),
                (DeclKind::Decorator, "property", 1),
                (DeclKind::Method, "norm", 1),
                (DeclKind::Method, "fetch", 1),
                (DeclKind::Function, "helper", 2),
                (DeclKind::Function, "add", 0),
            ]
        );

        assert_eq!(decls[1].extends.as_deref(), Some("Base, metaclass=Meta"));
        assert_eq!(decls[1].line, 2);
        assert_eq!(decls[2].ty.as_deref(), Some("int"));
        assert_eq!(decls[3].ty.as_deref(), Some("Dict[str, int]"));
        assert!(decls[4].has_unknown_type());
        assert_eq!(params(&decls[5]), vec!["self", "x", "y=2"]);
        assert_eq!(decls[7].ty.as_deref(), Some("float"));
        assert_eq!(decls[8].qualifier.as_deref(), Some("async"));
        assert_eq!(
            params(&decls[8]),
            vec!["self", "url: str", "*", "timeout: float = 1.0"]
        );
        assert_eq!(decls[8].ty.as_deref(), Some("Dict[str, List[int]]"));
    }

    #[test]
    fn test_multiline_signature() {
        let code = "def long(\n    first,\n    second=(1, 2),\n    *args,\n    **kwargs,\n) -> None:\n    pass\n";
        let decls = extract(code).declarations;
        assert_eq!(decls.len(), 1);
        assert_eq!(params(&decls[0]), vec!["first", "second=(1, 2)", "*args", "**kwargs"]);
        assert_eq!(decls[0].ty.as_deref(), Some("None"));
    }

    #[test]
    fn test_strings_and_comments_ignored() {
        let code = "# def commented(): pass\nx = \"def quoted(): pass\"\ntext = '''\nclass Fake:\n    pass\n'''\n";
        assert!(extract(code).declarations.is_empty());
    }

    #[test]
    fn test_class_without_bases() {
        let decls = extract("class Empty:\n    pass\n\nclass Other(): ...\n").declarations;
        assert_eq!(decls.len(), 2);
        assert!(decls[0].extends.is_none());
        assert!(decls[1].extends.is_none());
        assert_eq!(decls[1].depth, 0);
    }

    #[test]
    fn test_control_flow_not_fields() {
        let code = "class A:\n    try:\n        x = 1\n    except:\n        pass\n    if DEBUG:\n        y = 2\n    else:\n        y = 3\n    z == 4\n";
        let decls = extract(code).declarations;
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].kind, DeclKind::Class);
    }

    #[test]
    fn test_def_inside_if_at_top_level() {
        let code = "if sys.version_info >= (3, 8):\n    def compat(x):\n        return x\nelse:\n    def compat(x):\n        return None\n";
        let decls = extract(code).declarations;
        assert_eq!(decls.len(), 2);
        assert!(decls.iter().all(|d| d.kind == DeclKind::Function && d.depth == 0));
    }

    #[test]
    fn test_backslash_continuation() {
        let code = "from os.path import join, \\\n    exists\n";
        assert_eq!(extract(code).imports, vec!["from os.path import join, exists"]);
    }
}
