//! Razor view scanner.
//!
//! Markup is ignored. Directives are read from line starts, and the code
//! inside `@{ }`, `@functions { }` and `@code { }` blocks goes through the
//! C# scanner. Functions in `<script>` elements go through the JavaScript
//! scanner. Line numbers are shifted back to positions in the view.

use std::sync::LazyLock;

use regex::Regex;

use super::csharp::{self, RootMembers};
use super::javascript;
use super::scan::{self, LineIndex, MaskStyle};
use super::{Declaration, Extraction};

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@(?:page|model|inject|inherits|layout|implements|attribute|namespace|typeparam)\b")
        .expect("directive regex is invalid")
});

static USING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@using\s+([^\s(].*?)\s*;?$").expect("using regex is invalid"));

static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@(?:functions|code)\s*\{|@\{|<script\b[^>]*>").expect("block regex is invalid")
});

static SCRIPT_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</script\s*>").expect("script end regex is invalid"));

/// Extract directives, usings and code-block declarations from a view.
pub fn extract(content: &str) -> Extraction {
    let mut out = Extraction::default();

    for line in content.lines() {
        let line = line.trim();
        if let Some(caps) = USING.captures(line) {
            out.add_import(scan::squash(&caps[1]));
        } else if DIRECTIVE.is_match(line) {
            out.directives.push(scan::squash(line));
        }
    }

    let lines = LineIndex::new(content);
    let mut cursor = 0;
    while let Some(found) = BLOCK_START.find_at(content, cursor) {
        if found.as_str().starts_with('<') {
            let body = found.end();
            let end = SCRIPT_END.find_at(content, body);
            let script_end = end.map_or(content.len(), |m| m.start());
            let script = javascript::extract(&content[body..script_end]);
            merge(&mut out, script.declarations, lines.line_of(body) - 1);
            cursor = end.map_or(content.len(), |m| m.end());
            continue;
        }

        // `@@` escapes a literal `@` in markup.
        if found.start() > 0 && content.as_bytes()[found.start() - 1] == b'@' {
            cursor = found.end();
            continue;
        }

        let open = found.end() - 1;
        let root = if found.as_str() == "@{" {
            RootMembers::Callables
        } else {
            RootMembers::All
        };
        let masked = scan::mask(&content[open..], MaskStyle::CSHARP).text;
        let close = scan::matching_close(&masked, 0, b'{', b'}')
            .map_or(content.len(), |c| open + c);

        let block = csharp::extract_block(&content[open + 1..close], root);
        for import in block.imports {
            out.add_import(import);
        }
        merge(&mut out, block.declarations, lines.line_of(open + 1) - 1);
        cursor = (close + 1).min(content.len());
    }

    out
}

fn merge(out: &mut Extraction, declarations: Vec<Declaration>, line_offset: usize) {
    out.declarations.extend(declarations.into_iter().map(|mut decl| {
        decl.line += line_offset;
        decl
    }));
}
