//! JavaScript declaration scanner.
//!
//! Top-level functions, classes and bindings are listed along with class
//! members. Anything nested inside a function body is not.

use std::sync::LazyLock;

use regex::Regex;

use super::scan::{self, Block, BraceRules, Context, Effect, LineIndex, MaskStyle, Scope, Snippet};
use super::{DeclKind, Declaration, Extraction, Params};

static IMPORT_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^import(?:\s*[{*'"]|\s+[\w$]|\s*$)"#).expect("import regex is invalid")
});

static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:const|let|var)\s+[^=]+=\s*require\s*\(").expect("require regex is invalid")
});

static EXPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^export(?:\s+default)?\b\s*").expect("export regex is invalid"));

static FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(async\s+)?function\b\s*\*?\s*([\w$]+)?\s*\(").expect("function regex is invalid")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^class\b(?:\s+([\w$]+))?(?:\s+extends\s+(.+?))?$").expect("class regex is invalid")
});

static BINDING_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:const|let|var)\s+([\w$]+)\s*=\s*(async\s+)?(?:function\b|\([^()]*(?:\([^()]*\)[^()]*)*\)\s*=>|[\w$]+\s*=>)")
        .expect("binding function regex is invalid")
});

static BINDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(const|let|var)\s+(.+)$").expect("binding regex is invalid"));

static METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(static\s+)?(async\s+)?(?:(get|set)\s+)?(?:\*\s*)?(#?[\w$]+)\s*\(")
        .expect("method regex is invalid")
});

static CLASS_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(static\s+)?(#?[\w$]+)\s*(?:=\s*(.*))?$").expect("class field regex is invalid")
});

static DECLARATION_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:export\s+(?:default\s+)?)?(?:const|let|var|class|(?:async\s+)?function)\b")
        .expect("declaration start regex is invalid")
});

static ARROW_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:async\s+)?(?:\([^()]*\)|[\w$]+)\s*=>|^(?:async\s+)?function\b")
        .expect("arrow value regex is invalid")
});

/// Extract imports and declarations from a JavaScript file.
pub fn extract(content: &str) -> Extraction {
    let masked = scan::mask(content, MaskStyle::JAVASCRIPT).text;
    let mut out = Extraction::default();
    collect_imports(content, &masked, &mut out);
    scan::scan_braces(content, &masked, &mut JsRules, &mut out);
    out
}

/// `import` statements (possibly spanning lines) and `require` bindings.
fn collect_imports(content: &str, masked: &str, out: &mut Extraction) {
    let mut pending: Option<usize> = None;

    for line in LineIndex::new(masked).ranges(masked.len()) {
        let trimmed = masked[line.clone()].trim_start();
        let lead = line.end - line.start - trimmed.len();

        if pending.is_none() {
            if IMPORT_START.is_match(trimmed) {
                pending = Some(line.start + lead);
            } else if REQUIRE.is_match(trimmed) {
                out.add_import(statement_text(content, masked, line.start + lead, line.end));
                continue;
            }
        }

        if let Some(start) = pending {
            let so_far = &masked[start..line.end];
            if so_far.contains(['\'', '"']) || so_far.trim_end().ends_with(';') {
                out.add_import(statement_text(content, masked, start, line.end));
                pending = None;
            }
        }
    }
}

/// Original text of `start..end`, cut at the first `;` and trailing comments.
fn statement_text(content: &str, masked: &str, start: usize, end: usize) -> String {
    let region = &masked[start..end];
    let cut = region.find(';').unwrap_or(region.len());
    let used = region[..cut].trim_end().len();
    scan::squash(&content[start..start + used])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Brace,
    Semicolon,
}

enum Found {
    Class(Declaration),
    Members(Vec<Declaration>),
    Initializer,
    Skip,
}

struct JsRules;

impl BraceRules for JsRules {
    fn open_block(&mut self, header: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Block {
        let header = if cx.scope.is_type() {
            header
        } else {
            let mut pieces = split_declarations(header);
            let last = pieces.pop().unwrap_or(header);
            for piece in pieces {
                statement(piece, cx, out);
            }
            last
        };

        match scan::first_match(header, |s| classify(s, cx, Terminator::Brace)) {
            Some(Found::Class(decl)) => {
                let scope = Scope::Type {
                    name: decl.name.clone(),
                    kind: decl.kind,
                };
                out.declarations.push(decl);
                Block::Container(scope)
            }
            Some(Found::Members(decls)) => {
                out.declarations.extend(decls);
                Block::Body
            }
            Some(Found::Initializer) => Block::Inline,
            Some(Found::Skip) | None => Block::Body,
        }
    }

    fn statement(&mut self, stmt: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Effect {
        if cx.scope.is_type() {
            statement(stmt, cx, out);
        } else {
            for piece in split_declarations(stmt) {
                statement(piece, cx, out);
            }
        }
        Effect::None
    }
}

fn statement(stmt: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) {
    if let Some(Found::Members(decls)) =
        scan::first_match(stmt, |s| classify(s, cx, Terminator::Semicolon))
    {
        out.declarations.extend(decls);
    }
}

/// Split before every line that opens a top-level declaration, so code
/// without semicolons yields one piece per declaration.
fn split_declarations(s: Snippet<'_>) -> Vec<Snippet<'_>> {
    let masked = s.masked();
    let mut cuts = vec![0];
    let mut depth = 0i32;
    let mut at_line_start = false;

    for (i, b) in masked.bytes().enumerate() {
        if at_line_start && !b.is_ascii_whitespace() {
            at_line_start = false;
            if depth == 0 && DECLARATION_START.is_match(&masked[i..]) {
                cuts.push(i);
            }
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'\n' => at_line_start = true,
            _ => {}
        }
    }
    cuts.push(masked.len());

    cuts.windows(2)
        .map(|w| s.slice(w[0]..w[1]))
        .filter(|piece| !piece.is_blank())
        .collect()
}

fn classify(s: Snippet<'_>, cx: &Context<'_>, term: Terminator) -> Option<Found> {
    let squashed = scan::squash(s.masked());
    if squashed.is_empty() {
        return None;
    }
    if cx.scope.is_type() {
        class_member(s, &squashed, cx.depth, term)
    } else {
        top_level(s, &squashed, cx.depth, term)
    }
}

fn top_level(s: Snippet<'_>, squashed: &str, depth: usize, term: Terminator) -> Option<Found> {
    let line = s.line();
    let exported = EXPORT.find(squashed);
    let text = exported.map_or(squashed, |m| &squashed[m.end()..]);
    let is_default = exported.is_some_and(|m| m.as_str().contains("default"));

    let module_statement = text.starts_with("import") || squashed.starts_with("export");
    if term == Terminator::Semicolon && module_statement {
        if !text.starts_with("const") && !text.starts_with("let") && !text.starts_with("var") {
            return Some(Found::Skip);
        }
    }

    if let Some(caps) = CLASS.captures(text) {
        let name = caps.get(1).map(|m| m.as_str()).or(is_default.then_some("default"))?;
        let extends = caps.get(2).map(|m| m.as_str().to_string());
        let decl = Declaration::new(DeclKind::Class, name, depth, line).with_extends(extends);
        return Some(Found::Class(decl));
    }

    if term == Terminator::Brace {
        if let Some(caps) = FUNCTION.captures(text) {
            let name = caps.get(2).map(|m| m.as_str()).or(is_default.then_some("default"))?;
            let decl = function(s, DeclKind::Function, name, depth, line);
            return Some(Found::Members(vec![with_async(decl, caps.get(1).is_some())]));
        }
    }

    if let Some(caps) = BINDING_FUNCTION.captures(text) {
        let decl = function(s, DeclKind::Function, &caps[1], depth, line);
        return Some(Found::Members(vec![with_async(decl, caps.get(2).is_some())]));
    }

    match term {
        Terminator::Brace => {
            let assigns = scan::find_top_level(s.masked(), false, scan::is_assign).is_some();
            assigns.then_some(Found::Initializer)
        }
        Terminator::Semicolon => {
            let caps = BINDING.captures(text)?;
            let keyword = caps.get(1).map_or("", |m| m.as_str());
            let list = caps.get(2).map_or("", |m| m.as_str());
            let decls = bindings(list, keyword, depth, line);
            (!decls.is_empty()).then_some(Found::Members(decls))
        }
    }
}

fn class_member(s: Snippet<'_>, text: &str, depth: usize, term: Terminator) -> Option<Found> {
    let line = s.line();

    if term == Terminator::Brace {
        if let Some(caps) = METHOD.captures(text) {
            let name = &caps[4];
            let (kind, qualifier) = match caps.get(3) {
                Some(accessor) => (DeclKind::Property, Some(accessor.as_str().to_string())),
                None if name == "constructor" => (DeclKind::Constructor, None),
                None => {
                    let words: Vec<&str> = [caps.get(1), caps.get(2)]
                        .into_iter()
                        .flatten()
                        .map(|m| m.as_str().trim())
                        .collect();
                    (DeclKind::Method, (!words.is_empty()).then(|| words.join(" ")))
                }
            };
            let decl = function(s, kind, name, depth, line);
            let decl = match qualifier {
                Some(q) => decl.with_qualifier(q),
                None => decl,
            };
            return Some(Found::Members(vec![decl]));
        }
    }

    let caps = CLASS_FIELD.captures(text)?;
    let name = &caps[2];
    let is_static = caps.get(1).is_some();
    let value = caps.get(3).map_or("", |m| m.as_str());

    if ARROW_VALUE.is_match(value) {
        let decl = function(s, DeclKind::Method, name, depth, line);
        let decl = if is_static { decl.with_qualifier("static") } else { decl };
        return Some(Found::Members(vec![decl]));
    }
    if term == Terminator::Brace {
        return None;
    }

    let decl = Declaration::new(DeclKind::Field, name, depth, line);
    let decl = if is_static { decl.with_qualifier("static") } else { decl };
    Some(Found::Members(vec![decl]))
}

/// A callable whose parameters are the first parenthesized group, or the
/// lone identifier before `=>`.
fn function(s: Snippet<'_>, kind: DeclKind, name: &str, depth: usize, line: usize) -> Declaration {
    let masked = s.masked();
    let paren = scan::find_top_level(masked, false, scan::is_open_paren);
    let arrow = scan::find_top_level(masked, false, scan::is_arrow);

    let params = match (paren, arrow) {
        (Some(open), arrow) if arrow.map_or(true, |a| open < a) => {
            let close = scan::matching_close(masked, open, b'(', b')').unwrap_or(masked.len());
            scan::params(s, open, close, false)
        }
        (_, Some(a)) => scan::trailing_name(&masked[..a], b"")
            .map(|(_, p)| p.to_string())
            .into_iter()
            .collect(),
        _ => Params::new(),
    };

    Declaration::new(kind, name, depth, line).with_params(params)
}

fn with_async(decl: Declaration, is_async: bool) -> Declaration {
    if is_async {
        decl.with_qualifier("async")
    } else {
        decl
    }
}

/// Variables from the declarator list of a `const`/`let`/`var` statement.
fn bindings(list: &str, keyword: &str, depth: usize, line: usize) -> Vec<Declaration> {
    scan::split_top_level(list, false)
        .into_iter()
        .filter_map(|range| {
            let piece = &list[range];
            let eq = scan::find_top_level(piece, false, scan::is_assign);
            let name = eq.map_or(piece, |e| &piece[..e]).trim();
            let value = eq.map_or("", |e| piece[e + 1..].trim());
            if !scan::is_identifier(name) || value.starts_with("require") {
                return None;
            }
            Some(Declaration::new(DeclKind::Variable, name, depth, line).with_qualifier(keyword))
        })
        .collect()
}
