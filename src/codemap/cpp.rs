//! C and C++ declaration scanner.

use std::sync::LazyLock;

use regex::Regex;

use super::scan::{self, Block, BraceRules, Context, Effect, MaskStyle, Scope, Snippet};
use super::{DeclKind, Declaration, Extraction, UNKNOWN_TYPE};

/// Storage and function specifiers that are not part of a type.
const STORAGE: &[&str] = &[
    "static", "inline", "virtual", "explicit", "extern", "constexpr", "consteval", "constinit",
    "friend", "mutable", "register", "thread_local", "__forceinline", "__inline",
];

const NOT_A_NAME: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "catch", "return", "sizeof", "alignof",
    "decltype", "static_assert", "defined", "throw", "new", "delete", "typeid", "__attribute__",
    "__declspec", "alignas", "noexcept",
];

/// Statements that never declare a member worth listing.
const SKIPPED_STATEMENTS: &[&str] = &[
    "friend", "using", "typedef", "static_assert", "return", "goto", "break", "continue",
    "template class", "template struct", "extern template",
];

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^#\s*include\s*([<"][^>"]*[>"])"#).expect("include regex is invalid")
});

static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:inline\s+)?namespace(?:\s+([\w:]+))?$").expect("namespace regex is invalid")
});

static EXTERN_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^extern\s*"[^"]*"$"#).expect("extern regex is invalid"));

static RECORD_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:typedef\s+)?(class|struct|union)\b\s*",
        r"(?:(?:alignas|__declspec|__attribute__)\s*\(.*?\)\s*)*",
        r"(?:[A-Z][A-Z0-9_]*\s+)??(\w+(?:::\w+)*)?\s*(<[^{]*>)?\s*(?:final\s*)?(?::\s*(.+))?$",
    ))
    .expect("record type regex is invalid")
});

static ENUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:typedef\s+)?enum\b(?:\s+(?:class|struct))?(?:\s+([A-Za-z_]\w*))?\s*(?::\s*[\w:\s]+)?$")
        .expect("enum regex is invalid")
});

static FORWARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(class|struct|union)\s+([\w:]+)$").expect("forward declaration regex is invalid")
});

static ACCESS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:public|private|protected|signals|Q_SIGNALS)(?:\s+(?:slots|Q_SLOTS))?\s*:")
        .expect("access label regex is invalid")
});

/// Extract includes and declarations from a C or C++ file.
pub fn extract(content: &str) -> Extraction {
    let mut masked = scan::mask(content, MaskStyle::C_LIKE).text;
    let mut out = Extraction::default();

    for range in scan::take_preprocessor_lines(&mut masked) {
        let directive = scan::squash(&content[range]);
        if let Some(caps) = INCLUDE.captures(&directive) {
            out.add_import(&caps[1]);
        }
    }

    scan::scan_braces(content, &masked, &mut CppRules, &mut out);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Brace,
    Semicolon,
}

enum Found {
    Namespace(Declaration),
    Type(Declaration),
    /// Declaration whose body is not scanned (enums).
    Opaque(Declaration),
    /// `extern "C" { ... }`
    Transparent,
    Members(Vec<Declaration>),
    Initializer,
    Skip,
}

struct CppRules;

impl BraceRules for CppRules {
    fn open_block(&mut self, header: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Block {
        match scan::first_match(header, |s| classify(s, cx, Terminator::Brace)) {
            Some(Found::Namespace(decl)) => {
                out.declarations.push(decl);
                Block::Container(Scope::Namespace)
            }
            Some(Found::Type(decl)) => {
                let name = decl.name.rsplit_once("::").map_or(decl.name.as_str(), |(_, n)| n);
                let scope = Scope::Type {
                    name: name.to_string(),
                    kind: decl.kind,
                };
                out.declarations.push(decl);
                Block::Container(scope)
            }
            Some(Found::Opaque(decl)) => {
                out.declarations.push(decl);
                Block::Body
            }
            Some(Found::Transparent) => Block::Transparent,
            Some(Found::Members(decls)) => {
                out.declarations.extend(decls);
                Block::Body
            }
            Some(Found::Initializer) => Block::Inline,
            Some(Found::Skip) | None => Block::Body,
        }
    }

    fn statement(&mut self, stmt: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Effect {
        if let Some(Found::Members(decls)) =
            scan::first_match(stmt, |s| classify(s, cx, Terminator::Semicolon))
        {
            out.declarations.extend(decls);
        }
        Effect::None
    }
}

fn classify(s: Snippet<'_>, cx: &Context<'_>, term: Terminator) -> Option<Found> {
    let s = s.after(skip_prefixes(s.masked()));
    let text = scan::squash(s.masked());
    if text.is_empty() {
        return None;
    }
    let line = s.line();

    match term {
        Terminator::Brace => {
            if EXTERN_BLOCK.is_match(&text) {
                return Some(Found::Transparent);
            }
            if let Some(caps) = NAMESPACE.captures(&text) {
                let name = caps.get(1).map_or("(anonymous)", |m| m.as_str());
                let decl = Declaration::new(DeclKind::Namespace, name, cx.depth, line);
                return Some(Found::Namespace(decl));
            }
            if let Some(caps) = RECORD_TYPE.captures(&text) {
                let kind = match &caps[1] {
                    "class" => DeclKind::Class,
                    "struct" => DeclKind::Struct,
                    _ => DeclKind::Union,
                };
                let name = caps.get(2).map_or("(anonymous)", |m| m.as_str());
                let extends = caps.get(4).map(|m| m.as_str().trim().to_string());
                let decl = Declaration::new(kind, name, cx.depth, line).with_extends(extends);
                return Some(Found::Type(decl));
            }
            if let Some(caps) = ENUM.captures(&text) {
                let name = caps.get(1).map_or("(anonymous)", |m| m.as_str());
                return Some(Found::Opaque(Declaration::new(DeclKind::Enum, name, cx.depth, line)));
            }
        }
        Terminator::Semicolon => {
            let skipped = SKIPPED_STATEMENTS.iter().any(|p| starts_with_word(&text, p));
            if skipped || ENUM.is_match(&text) {
                return Some(Found::Skip);
            }
            if let Some(caps) = FORWARD.captures(&text) {
                let decl = Declaration::new(DeclKind::ForwardDecl, &caps[2], cx.depth, line)
                    .with_qualifier(&caps[1]);
                return Some(Found::Members(vec![decl]));
            }
        }
    }

    let masked = s.masked();
    let paren = scan::find_top_level(masked, true, scan::is_open_paren);
    let assign = scan::find_top_level(masked, true, scan::is_assign);

    let callable_paren = paren
        .filter(|&p| p < assign.unwrap_or(usize::MAX) && !masked[..p].trim().is_empty());
    if let Some(open) = callable_paren {
        if masked[open + 1..].trim_start().starts_with(['*', '&', '^']) {
            return match term {
                Terminator::Brace => Some(Found::Initializer),
                Terminator::Semicolon => function_pointer(masked, open, cx.depth, line),
            };
        }
        return callable(s, open, cx, line);
    }

    match term {
        Terminator::Brace => {
            let declares = matches!(
                scan::split_type_and_name(&text),
                Some((Some(ty), _)) if scan::looks_like_type(&ty)
            );
            (assign.is_some() || declares).then_some(Found::Initializer)
        }
        Terminator::Semicolon => {
            let decls = declarators(&text, cx.depth, line);
            (!decls.is_empty()).then_some(Found::Members(decls))
        }
    }
}

fn callable(s: Snippet<'_>, open: usize, cx: &Context<'_>, line: usize) -> Option<Found> {
    let masked = s.masked();
    let raw = masked[..open].trim_end();
    let mut open = open;

    let (start, name) = match find_operator(raw) {
        Some(idx) => {
            let mut name = scan::squash(&raw[idx..]);
            // `operator()` takes its parameters from the second group.
            if name == "operator" && masked[open + 1..].trim_start().starts_with(')') {
                let close = scan::matching_close(masked, open, b'(', b')')?;
                open = close + 1 + masked[close + 1..].find('(')?;
                name.push_str("()");
            }
            (idx, name)
        }
        None => {
            let before = scan::strip_generic_suffix(raw);
            let (start, name) = scan::trailing_name(before, b":~")?;
            (start, name.trim_start_matches(':').to_string())
        }
    };

    let simple = name.rsplit_once("::").map_or(name.as_str(), |(_, n)| n);
    if simple.is_empty() || NOT_A_NAME.contains(&simple) {
        return None;
    }
    let owner = name
        .rsplit_once("::")
        .map(|(q, _)| q.rsplit_once("::").map_or(q, |(_, c)| c));

    let prefix = scan::squash(&raw[..start]);
    let ret = scan::strip_leading_words(&prefix, STORAGE);

    let kind = if simple.starts_with('~') {
        DeclKind::Destructor
    } else if ret.is_empty() && (cx.scope.type_name() == Some(simple) || owner == Some(simple)) {
        DeclKind::Constructor
    } else if ret.is_empty() || !scan::looks_like_type(ret) {
        // Macro invocations and calls.
        return None;
    } else if cx.scope.is_type() {
        DeclKind::Method
    } else {
        DeclKind::Function
    };

    let close = scan::matching_close(masked, open, b'(', b')').unwrap_or(masked.len());
    let params = scan::params(s, open, close, true);
    let mut decl = Declaration::new(kind, name.as_str(), cx.depth, line).with_params(params);
    if matches!(kind, DeclKind::Method | DeclKind::Function) {
        decl = decl.with_type(scan::tidy_type(ret));
    }
    if let Some(qualifiers) = trailing_qualifiers(masked.get(close + 1..).unwrap_or("")) {
        decl = decl.with_qualifier(qualifiers);
    }
    Some(Found::Members(vec![decl]))
}

/// `int (*handler)(int);` style members.
fn function_pointer(masked: &str, open: usize, depth: usize, line: usize) -> Option<Found> {
    let close = scan::matching_close(masked, open, b'(', b')')?;
    let inner = masked[open + 1..close]
        .trim_start_matches(|c: char| matches!(c, '*' | '&' | '^') || c.is_whitespace());
    let name = scan::strip_array_suffix(inner.trim());
    if !scan::is_identifier(name) {
        return None;
    }
    let decl = Declaration::new(DeclKind::Field, name, depth, line).with_type(UNKNOWN_TYPE);
    Some(Found::Members(vec![decl]))
}

/// Fields from `int a = 1, *b, c[4]` style text (already squashed).
fn declarators(text: &str, depth: usize, line: usize) -> Vec<Declaration> {
    let mut decls = Vec::new();
    let mut base = String::new();

    for (i, range) in scan::split_top_level(text, true).into_iter().enumerate() {
        let piece = &text[range];
        let end = scan::find_top_level(piece, true, |b, i| {
            scan::is_assign(b, i) || b[i] == b'{' || is_bitfield_colon(b, i)
        })
        .unwrap_or(piece.len());
        let left = piece[..end].trim();

        if i == 0 {
            let left = scan::strip_leading_words(left, STORAGE);
            let Some((Some(declared), name)) = scan::split_type_and_name(left) else {
                return decls;
            };
            let stripped = declared.trim_end_matches(['*', '&']);
            let pointer = &declared[stripped.len()..];
            base = if scan::looks_like_type(stripped) {
                stripped.to_string()
            } else {
                UNKNOWN_TYPE.to_string()
            };
            let decl = Declaration::new(DeclKind::Field, name, depth, line)
                .with_type(with_pointer(&base, pointer));
            decls.push(decl);
        } else {
            let name = left.trim_start_matches(['*', '&', ' ']);
            let pointer: String = left[..left.len() - name.len()]
                .chars()
                .filter(|c| *c != ' ')
                .collect();
            let name = scan::strip_array_suffix(name);
            if scan::is_identifier(name) {
                let decl = Declaration::new(DeclKind::Field, name, depth, line)
                    .with_type(with_pointer(&base, &pointer));
                decls.push(decl);
            }
        }
    }
    decls
}

fn with_pointer(base: &str, pointer: &str) -> String {
    if base == UNKNOWN_TYPE {
        base.to_string()
    } else {
        format!("{base}{pointer}")
    }
}

fn is_bitfield_colon(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b':'
        && bytes.get(i + 1) != Some(&b':')
        && i.checked_sub(1).map(|p| bytes[p]) != Some(b':')
}

/// `const`, `noexcept`, `override`, `= 0` and friends after a parameter list.
fn trailing_qualifiers(tail: &str) -> Option<String> {
    let tail = scan::squash(&tail.replace('=', " = "));
    let mut qualifiers: Vec<&str> = tail
        .split(' ')
        .take_while(|w| matches!(*w, "const" | "volatile" | "noexcept" | "override" | "final"))
        .collect();
    for marker in ["= 0", "= default", "= delete"] {
        if tail.ends_with(marker) {
            qualifiers.push(marker);
        }
    }
    (!qualifiers.is_empty()).then(|| qualifiers.join(" "))
}

/// Offset of an `operator` keyword that names the function before `(`.
fn find_operator(raw: &str) -> Option<usize> {
    let idx = raw.rfind("operator")?;
    let bytes = raw.as_bytes();
    let starts_word = idx == 0 || !scan::is_ident_byte(bytes[idx - 1]);
    let rest = &raw[idx + "operator".len()..];
    let ends_word = !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_');
    (starts_word && ends_word).then_some(idx)
}

/// Offset past attributes, access labels, and `template<...>` prefixes.
fn skip_prefixes(masked: &str) -> usize {
    let mut pos = 0;
    loop {
        let before = pos;
        pos += scan::skip_attributes(&masked[pos..]);

        let rest = &masked[pos..];
        let trimmed = rest.trim_start();
        let lead = rest.len() - trimmed.len();

        if let Some(m) = ACCESS_LABEL.find(trimmed) {
            let after = pos + lead + m.end();
            if masked.as_bytes().get(after) != Some(&b':') {
                pos = after;
            }
        } else if starts_with_word(trimmed, "template") {
            let open = trimmed.find('<');
            let close = open.and_then(|o| scan::matching_close(trimmed, o, b'<', b'>'));
            if let Some(close) = close {
                pos += lead + close + 1;
            }
        }

        if pos == before {
            return pos;
        }
    }
}

fn starts_with_word(text: &str, word: &str) -> bool {
    text.strip_prefix(word)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"#include <vector>
#include "util/helpers.h"
#include <vector>
#define MAX(a, b) ((a) > (b) ? (a) : (b))

namespace geo {

template <typename T>
class Shape : public Base<T>, private Noncopyable {
public:
    Shape(int sides);
    virtual ~Shape();
    virtual double area() const = 0;
    static int count;
protected:
    int sides_, *edges_;
    char name_[32];
    void (*on_change)(int);
    enum Kind { Round, Square };
};

struct Point { int x, y; };

extern "C" {
    int c_api(const char* name, int len);
}

Shape::Shape(int sides) : sides_(sides) {
    if (sides > 0) { count++; }
}

int add(int a, int b) { return a + b; }

}  // namespace geo

class Forward;
typedef unsigned long ulong;
"#;

    fn find<'a>(decls: &'a [Declaration], name: &str) -> &'a Declaration {
        decls
            .iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("{name} not found in {decls:?}"))
    }

    #[test]
    fn test_includes() {
        let out = extract(SAMPLE);
        assert_eq!(out.imports, vec!["<vector>", "\"util/helpers.h\""]);
    }

    #[test]
    fn test_declaration_order_and_depth() {
        let decls = extract(SAMPLE).declarations;
        let summary: Vec<_> = decls.iter().map(|d| (d.kind, d.name.as_str(), d.depth)).collect();
        assert_eq!(
            summary,
            vec![
                (DeclKind::Namespace, "geo", 0),
                (DeclKind::Class, "Shape", 1),
                (DeclKind::Constructor, "Shape", 2),
                (DeclKind::Destructor, "~Shape", 2),
                (DeclKind::Method, "area", 2),
                (DeclKind::Field, "count", 2),
                (DeclKind::Field, "sides_", 2),
                (DeclKind::Field, "edges_", 2),
                (DeclKind::Field, "name_", 2),
                (DeclKind::Field, "on_change", 2),
                (DeclKind::Enum, "Kind", 2),
                (DeclKind::Struct, "Point", 1),
                (DeclKind::Field, "x", 2),
                (DeclKind::Field, "y", 2),
                (DeclKind::Function, "c_api", 1),
                (DeclKind::Constructor, "Shape::Shape", 1),
                (DeclKind::Function, "add", 1),
                (DeclKind::ForwardDecl, "Forward", 0),
            ]
        );
        assert_eq!(find(&decls, "Forward").qualifier.as_deref(), Some("class"));
    }

    #[test]
    fn test_class_bases() {
        let decls = extract(SAMPLE).declarations;
        assert_eq!(
            find(&decls, "Shape").extends.as_deref(),
            Some("public Base<T>, private Noncopyable")
        );
    }

    #[test]
    fn test_field_types() {
        let decls = extract(SAMPLE).declarations;
        assert_eq!(find(&decls, "count").ty.as_deref(), Some("int"));
        assert_eq!(find(&decls, "sides_").ty.as_deref(), Some("int"));
        assert_eq!(find(&decls, "edges_").ty.as_deref(), Some("int*"));
        assert_eq!(find(&decls, "name_").ty.as_deref(), Some("char"));
        assert!(find(&decls, "on_change").has_unknown_type());
    }

    #[test]
    fn test_pure_virtual_method() {
        let decls = extract(SAMPLE).declarations;
        let area = find(&decls, "area");
        assert_eq!(area.ty.as_deref(), Some("double"));
        assert_eq!(area.qualifier.as_deref(), Some("const = 0"));
        assert_eq!(area.params.as_ref().map(|p| p.len()), Some(0));
    }

    #[test]
    fn test_function_params() {
        let decls = extract(SAMPLE).declarations;
        let api = find(&decls, "c_api");
        assert_eq!(api.ty.as_deref(), Some("int"));
        assert_eq!(
            api.params.as_ref().map(|p| p.as_slice()),
            Some(&["const char* name".to_string(), "int len".to_string()][..])
        );
    }

    #[test]
    fn test_c_style_definitions() {
        let code = r#"
static int
compute(int a)
{
    return a;
}

struct node *make_node(void);
int counter = 0;
"#;
        let decls = extract(code).declarations;
        let compute = find(&decls, "compute");
        assert_eq!(compute.kind, DeclKind::Function);
        assert_eq!(compute.ty.as_deref(), Some("int"));

        let make = find(&decls, "make_node");
        assert_eq!(make.ty.as_deref(), Some("struct node*"));
        assert_eq!(make.params.as_ref().map(|p| p.as_slice()), Some(&["void".to_string()][..]));

        assert_eq!(find(&decls, "counter").kind, DeclKind::Field);
    }

    #[test]
    fn test_macros_and_calls_are_not_functions() {
        let code = "TEST(Suite, Case) {\n  EXPECT_EQ(1, 1);\n}\nQ_DECLARE_METATYPE(Foo);\n";
        assert!(extract(code).declarations.is_empty());
    }

    #[test]
    fn test_operators() {
        let code = "struct V {\n  V operator+(const V& o) const;\n  bool operator()(int x);\n};\n";
        let decls = extract(code).declarations;
        let plus = find(&decls, "operator+");
        assert_eq!(plus.ty.as_deref(), Some("V"));
        assert_eq!(plus.qualifier.as_deref(), Some("const"));
        let call = find(&decls, "operator()");
        assert_eq!(call.params.as_ref().map(|p| p.len()), Some(1));
    }

    #[test]
    fn test_anonymous_namespace_and_struct() {
        let code = "namespace {\n  typedef struct {\n    int a;\n  } Pair;\n}\n";
        let decls = extract(code).declarations;
        assert_eq!(decls[0].name, "(anonymous)");
        assert_eq!(decls[1].kind, DeclKind::Struct);
        assert_eq!(decls[1].name, "(anonymous)");
        assert_eq!(decls[2].name, "a");
        assert_eq!(decls.len(), 3);
    }

    #[test]
    fn test_large_initializer_table() {
        let mut code = String::from("static const unsigned char font_data[] = {\n");
        code.push_str(&"    0x00, 0x3c, 0x42, 0x81,\n".repeat(20_000));
        code.push_str("};\n\nint glyph_width(int c)\n{\n    return 8;\n}\n");
        let decls = extract(&code).declarations;
        assert_eq!(find(&decls, "font_data").kind, DeclKind::Field);
        assert_eq!(find(&decls, "glyph_width").kind, DeclKind::Function);
        assert_eq!(decls.len(), 2);
    }
}
