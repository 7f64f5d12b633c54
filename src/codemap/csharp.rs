//! C# declaration scanner.

use std::sync::LazyLock;

use regex::Regex;

use super::scan::{self, Block, BraceRules, Context, Effect, MaskStyle, Scope, Snippet};
use super::{DeclKind, Declaration, Extraction, UNKNOWN_TYPE};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "sealed", "abstract", "partial",
    "readonly", "virtual", "override", "extern", "async", "unsafe", "new", "volatile", "const",
    "required", "file", "implicit", "explicit", "fixed",
];

/// Words that precede `(` in statements but never name a member.
const NOT_A_NAME: &[&str] = &[
    "if", "else", "for", "foreach", "while", "do", "switch", "case", "catch", "using", "lock",
    "fixed", "return", "new", "typeof", "nameof", "sizeof", "default", "base", "this", "when",
    "throw", "await", "checked", "unchecked", "get", "set", "init", "add", "remove",
    "stackalloc",
];

static USING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:global\s+)?using\s+(static\s+)?(?:(@?\w+)\s*=\s*)?(@?[\w.]+(?:\s*<.*>)?)$")
        .expect("using regex is invalid")
});

static NAMESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^namespace\s+(@?[\w.]+)$").expect("namespace regex is invalid"));

static TYPE_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:(?:public|private|protected|internal|static|sealed|abstract|partial|readonly|ref|unsafe|new|file)\s+)*",
        r"(class|struct|interface|enum|record(?:\s+class|\s+struct)?)\s+@?(\w+)\s*(<[^<>]*>)?",
        r"\s*(\(.*?\))?\s*(?::\s*(.+?))?\s*(?:\bwhere\b.*)?$",
    ))
    .expect("type declaration regex is invalid")
});

static ACCESSOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[{};\]])\s*(?:(?:public|private|protected|internal)\s+)*(get|set|init)\b")
        .expect("accessor regex is invalid")
});

/// Which members are legal outside any type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RootMembers {
    /// Regular source files: only local functions of top-level statements.
    Callables,
    /// Razor `@functions` and `@code` blocks, whose root is a class body.
    All,
}

/// Extract declarations from a `.cs` file.
pub fn extract(content: &str) -> Extraction {
    extract_block(content, RootMembers::Callables)
}

/// Extract declarations from C# text whose root scope follows `root`.
pub(crate) fn extract_block(content: &str, root: RootMembers) -> Extraction {
    let mut masked = scan::mask(content, MaskStyle::CSHARP).text;
    scan::take_preprocessor_lines(&mut masked);

    let mut out = Extraction::default();
    scan::scan_braces(content, &masked, &mut CSharpRules { root }, &mut out);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Brace,
    Semicolon,
}

enum Found {
    Import(String),
    Namespace(Declaration),
    Type(Declaration),
    Members(Vec<Declaration>),
    /// Braces of an initializer; the statement ends at the next `;`.
    Initializer,
}

struct CSharpRules {
    root: RootMembers,
}

impl BraceRules for CSharpRules {
    fn open_block(&mut self, header: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Block {
        match scan::first_match(header, |s| self.classify(s, cx, Terminator::Brace)) {
            Some(Found::Namespace(decl)) => {
                out.declarations.push(decl);
                Block::Container(Scope::Namespace)
            }
            Some(Found::Type(decl)) => {
                let scope = Scope::Type {
                    name: base_name(&decl.name).to_string(),
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
            Some(Found::Import(_)) | None => Block::Body,
        }
    }

    fn statement(&mut self, stmt: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Effect {
        match scan::first_match(stmt, |s| self.classify(s, cx, Terminator::Semicolon)) {
            Some(Found::Import(import)) => out.add_import(import),
            Some(Found::Namespace(decl)) => {
                out.declarations.push(decl);
                return Effect::NestScope;
            }
            // Positional records end with `;` and have no body.
            Some(Found::Type(decl)) => out.declarations.push(decl),
            Some(Found::Members(decls)) => out.declarations.extend(decls),
            Some(Found::Initializer) | None => {}
        }
        Effect::None
    }
}

impl CSharpRules {
    fn members_allowed(&self, scope: &Scope) -> bool {
        scope.is_type() || (*scope == Scope::Root && self.root == RootMembers::All)
    }

    fn callables_allowed(&self, scope: &Scope) -> bool {
        scope.is_type() || *scope == Scope::Root
    }

    fn classify(&self, s: Snippet<'_>, cx: &Context<'_>, term: Terminator) -> Option<Found> {
        let s = s.after(scan::skip_attributes(s.masked()));
        let text = scan::squash(s.masked());
        if text.is_empty() {
            return None;
        }
        let line = s.line();

        if !cx.scope.is_type() {
            if term == Terminator::Semicolon {
                if let Some(caps) = USING.captures(&text) {
                    let target = scan::squash(&caps[3]);
                    let import = match (caps.get(1), caps.get(2)) {
                        (Some(_), _) => format!("static {target}"),
                        (None, Some(alias)) => format!("{} = {target}", alias.as_str()),
                        (None, None) => target,
                    };
                    return Some(Found::Import(import));
                }
            }
            if let Some(caps) = NAMESPACE.captures(&text) {
                let decl = Declaration::new(DeclKind::Namespace, &caps[1], cx.depth, line);
                return Some(Found::Namespace(decl));
            }
        }

        if let Some(caps) = TYPE_DECL.captures(&text) {
            let kind = match &caps[1] {
                "class" => DeclKind::Class,
                "struct" => DeclKind::Struct,
                "interface" => DeclKind::Interface,
                "enum" => DeclKind::Enum,
                _ => DeclKind::Record,
            };
            let name = format!("{}{}", &caps[2], caps.get(3).map_or("", |m| m.as_str()));
            let extends = caps.get(5).map(|m| m.as_str().trim().to_string());
            let decl = Declaration::new(kind, name, cx.depth, line).with_extends(extends);
            return Some(Found::Type(decl));
        }

        let rest = scan::strip_leading_words(&text, MODIFIERS);
        if let Some(event) = rest.strip_prefix("event ") {
            if !self.members_allowed(cx.scope) {
                return None;
            }
            let decls = declarators(event, DeclKind::Event, cx.depth, line);
            return (!decls.is_empty()).then_some(Found::Members(decls));
        }

        let masked = s.masked();
        let paren = scan::find_top_level(masked, true, scan::is_open_paren);
        let assign = scan::find_top_level(masked, true, scan::is_assign);
        let arrow = scan::find_top_level(masked, true, scan::is_arrow);

        let callable_paren = paren.filter(|&p| {
            p < assign.unwrap_or(usize::MAX)
                && p < arrow.unwrap_or(usize::MAX)
                && !masked[..p].trim().is_empty()
        });
        if let Some(open) = callable_paren {
            return self
                .callable(s, open, cx, line)
                .map(|decl| Found::Members(vec![decl]));
        }

        if !self.members_allowed(cx.scope) {
            return None;
        }

        match term {
            Terminator::Brace if assign.is_some() || arrow.is_some() => Some(Found::Initializer),
            Terminator::Brace => property(&text, accessor_summary(s.rest()), cx.depth, line),
            Terminator::Semicolon => match arrow {
                Some(a) if assign.map_or(true, |x| a < x) => {
                    property(&scan::squash(&masked[..a]), "{ get; }".to_string(), cx.depth, line)
                }
                _ => {
                    let decls = declarators(&text, DeclKind::Field, cx.depth, line);
                    (!decls.is_empty()).then_some(Found::Members(decls))
                }
            },
        }
    }

    fn callable(
        &self,
        s: Snippet<'_>,
        open: usize,
        cx: &Context<'_>,
        line: usize,
    ) -> Option<Declaration> {
        let masked = s.masked();
        let before = scan::strip_generic_suffix(&masked[..open]);

        let (start, name) = match before.rfind("operator") {
            Some(idx) if idx == 0 || !scan::is_ident_byte(before.as_bytes()[idx - 1]) => {
                (idx, scan::squash(&before[idx..]))
            }
            _ => {
                let (start, name) = scan::trailing_name(before, b".~@")?;
                (start, name.trim_start_matches('@').to_string())
            }
        };
        if name.is_empty() || name.starts_with('.') || NOT_A_NAME.contains(&name.as_str()) {
            return None;
        }

        let prefix = scan::squash(&before[..start]);
        let prefix = scan::strip_leading_words(&prefix, MODIFIERS);
        let (is_delegate, ret) = match prefix.strip_prefix("delegate") {
            Some(r) if r.is_empty() || r.starts_with(' ') => (true, r.trim()),
            _ => (false, prefix),
        };

        let kind = if is_delegate {
            DeclKind::Delegate
        } else if name.starts_with('~') {
            DeclKind::Destructor
        } else if ret.is_empty() && cx.scope.type_name() == Some(name.as_str()) {
            DeclKind::Constructor
        } else if ret.is_empty() && !name.starts_with("operator") {
            // A call such as `app.Run()`.
            return None;
        } else {
            DeclKind::Method
        };

        if !is_delegate && !self.callables_allowed(cx.scope) {
            return None;
        }
        if !ret.is_empty() && !scan::looks_like_type(ret) {
            return None;
        }

        let close = scan::matching_close(masked, open, b'(', b')').unwrap_or(masked.len());
        let params = scan::params(s, open, close, true);
        let decl = Declaration::new(kind, name, cx.depth, line).with_params(params);
        Some(if ret.is_empty() { decl } else { decl.with_type(ret) })
    }
}

/// Property (or indexer) from its header text.
fn property(text: &str, accessors: String, depth: usize, line: usize) -> Option<Found> {
    let text = scan::strip_leading_words(text, MODIFIERS);
    let (ty, name) = match text.find("this[") {
        Some(idx) => (text[..idx].trim().to_string(), text[idx..].to_string()),
        None => {
            let (ty, name) = scan::split_type_and_name(text)?;
            (ty?, name)
        }
    };
    if ty.is_empty() {
        return None;
    }
    let ty = if scan::looks_like_type(&ty) {
        ty
    } else {
        UNKNOWN_TYPE.to_string()
    };

    let decl = Declaration::new(DeclKind::Property, name, depth, line)
        .with_type(ty)
        .with_qualifier(accessors);
    Some(Found::Members(vec![decl]))
}

/// `{ get; set; }` style summary of the accessor block at the start of `rest`.
fn accessor_summary(rest: &str) -> String {
    let body = scan::matching_close(rest, 0, b'{', b'}').map_or(rest, |close| &rest[..close]);
    let mut found: Vec<&str> = Vec::new();
    for caps in ACCESSOR.captures_iter(body) {
        if let Some(m) = caps.get(1) {
            if !found.contains(&m.as_str()) {
                found.push(m.as_str());
            }
        }
    }
    if found.is_empty() {
        found.push("get");
    }
    let inner: Vec<String> = found.iter().map(|a| format!("{a};")).collect();
    format!("{{ {} }}", inner.join(" "))
}

/// Declarations from `Type a = 1, b` style text (already squashed).
///
/// Every declarator shares the type of the first one.
fn declarators(text: &str, kind: DeclKind, depth: usize, line: usize) -> Vec<Declaration> {
    let mut decls = Vec::new();
    let mut ty = String::new();

    for (i, range) in scan::split_top_level(text, true).into_iter().enumerate() {
        let piece = &text[range];
        let end = scan::find_top_level(piece, true, scan::is_assign).unwrap_or(piece.len());
        let left = piece[..end].trim();

        if i == 0 {
            let left = scan::strip_leading_words(left, MODIFIERS);
            let Some((Some(declared), name)) = scan::split_type_and_name(left) else {
                return decls;
            };
            ty = if scan::looks_like_type(&declared) {
                declared
            } else {
                UNKNOWN_TYPE.to_string()
            };
            decls.push(Declaration::new(kind, name, depth, line).with_type(ty.clone()));
        } else {
            let name = scan::strip_array_suffix(left);
            if scan::is_identifier(name) {
                decls.push(Declaration::new(kind, name, depth, line).with_type(ty.clone()));
            }
        }
    }
    decls
}

/// Type name without generic parameters, for constructor matching.
fn base_name(name: &str) -> &str {
    name.find('<').map_or(name, |i| &name[..i])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"using System;
using static System.Math;
using Json = System.Text.Json;
using System;

namespace Demo.App;

[Serializable]
public class User<T> : Entity, IComparable<User<T>> where T : class
{
    private int _count;
    public string Name { get; set; } = "{";
    public int Age { get; private set; }
    public int Double => _count * 2;
    public event EventHandler Changed;
    public delegate int Op(int a, int b);
    private readonly Dictionary<string, int> _map = new(), _other;

    public User(string name) { }
    ~User() { }

    [HttpGet("x")]
    public async Task<IActionResult> Get<TKey>(int id, string q = "a, b") where TKey : struct
    {
        if (id > 0) { return Ok(); }
        return null;
    }

    public override string ToString() => Name;
}
"#;

    fn find<'a>(decls: &'a [Declaration], name: &str) -> &'a Declaration {
        decls
            .iter()
            .find(|d| d.name == name)
            .unwrap_or_else(|| panic!("{name} not found in {decls:?}"))
    }

    #[test]
    fn test_usings_deduplicated_in_order() {
        let out = extract(SAMPLE);
        assert_eq!(
            out.imports,
            vec!["System", "static System.Math", "Json = System.Text.Json"]
        );
    }

    #[test]
    fn test_file_scoped_namespace_nests() {
        let decls = extract(SAMPLE).declarations;
        let ns = find(&decls, "Demo.App");
        assert_eq!(ns.kind, DeclKind::Namespace);
        assert_eq!(ns.depth, 0);

        let class = find(&decls, "User<T>");
        assert_eq!(class.kind, DeclKind::Class);
        assert_eq!(class.depth, 1);
        assert_eq!(class.line, 9);
        assert_eq!(class.extends.as_deref(), Some("Entity, IComparable<User<T>>"));
    }

    #[test]
    fn test_private_field() {
        let decls = extract(SAMPLE).declarations;
        let field = find(&decls, "_count");
        assert_eq!(field.kind, DeclKind::Field);
        assert_eq!(field.ty.as_deref(), Some("int"));
        assert_eq!(field.depth, 2);
    }

    #[test]
    fn test_properties() {
        let decls = extract(SAMPLE).declarations;
        let name = find(&decls, "Name");
        assert_eq!(name.kind, DeclKind::Property);
        assert_eq!(name.ty.as_deref(), Some("string"));
        assert_eq!(name.qualifier.as_deref(), Some("{ get; set; }"));

        assert_eq!(find(&decls, "Age").qualifier.as_deref(), Some("{ get; set; }"));

        let double = find(&decls, "Double");
        assert_eq!(double.kind, DeclKind::Property);
        assert_eq!(double.qualifier.as_deref(), Some("{ get; }"));
    }

    #[test]
    fn test_events_and_delegates() {
        let decls = extract(SAMPLE).declarations;
        let event = find(&decls, "Changed");
        assert_eq!(event.kind, DeclKind::Event);
        assert_eq!(event.ty.as_deref(), Some("EventHandler"));

        let op = find(&decls, "Op");
        assert_eq!(op.kind, DeclKind::Delegate);
        assert_eq!(op.ty.as_deref(), Some("int"));
        assert_eq!(op.params.as_ref().map(|p| p.len()), Some(2));
    }

    #[test]
    fn test_multiple_declarators_share_type() {
        let decls = extract(SAMPLE).declarations;
        assert_eq!(find(&decls, "_map").ty.as_deref(), Some("Dictionary<string, int>"));
        assert_eq!(find(&decls, "_other").ty.as_deref(), Some("Dictionary<string, int>"));
    }

    #[test]
    fn test_constructor_and_destructor() {
        let decls = extract(SAMPLE).declarations;
        let ctor = find(&decls, "User");
        assert_eq!(ctor.kind, DeclKind::Constructor);
        assert_eq!(
            ctor.params.as_ref().map(|p| p.as_slice()),
            Some(&["string name".to_string()][..])
        );
        assert!(ctor.ty.is_none());

        let dtor = find(&decls, "~User");
        assert_eq!(dtor.kind, DeclKind::Destructor);
    }

    #[test]
    fn test_method_with_attributes_generics_and_defaults() {
        let decls = extract(SAMPLE).declarations;
        let get = find(&decls, "Get");
        assert_eq!(get.kind, DeclKind::Method);
        assert_eq!(get.ty.as_deref(), Some("Task<IActionResult>"));
        let params = get.params.as_ref().expect("params");
        assert_eq!(params.as_slice(), ["int id", "string q = \"a, b\""]);

        let to_string = find(&decls, "ToString");
        assert_eq!(to_string.kind, DeclKind::Method);
        assert_eq!(to_string.ty.as_deref(), Some("string"));
    }

    #[test]
    fn test_method_bodies_are_skipped() {
        let decls = extract(SAMPLE).declarations;
        assert!(decls.iter().all(|d| d.name != "Ok" && d.name != "if"));
    }

    #[test]
    fn test_block_namespace_and_nested_types() {
        let code = r#"
namespace Outer {
    public interface IRepo {
        void Save(int id);
        int Count { get; }
    }

    internal sealed record Point(int X, int Y);

    public enum Color : byte { Red, Green = 2 }

    public struct Pair {
        public class Node { }
    }
}
"#;
        let decls = extract(code).declarations;
        let summary: Vec<_> = decls.iter().map(|d| (d.kind, d.name.as_str(), d.depth)).collect();
        assert_eq!(
            summary,
            vec![
                (DeclKind::Namespace, "Outer", 0),
                (DeclKind::Interface, "IRepo", 1),
                (DeclKind::Method, "Save", 2),
                (DeclKind::Property, "Count", 2),
                (DeclKind::Record, "Point", 1),
                (DeclKind::Enum, "Color", 1),
                (DeclKind::Struct, "Pair", 1),
                (DeclKind::Class, "Node", 2),
            ]
        );
        assert_eq!(find(&decls, "Color").extends.as_deref(), Some("byte"));
    }

    #[test]
    fn test_unrecognized_field_type_is_unknown() {
        let decls = extract("class A { private %weird% value; }").declarations;
        let field = find(&decls, "value");
        assert!(field.has_unknown_type());
    }

    #[test]
    fn test_top_level_statements() {
        let code = r#"using System;
var builder = WebApplication.CreateBuilder(args);
app.MapGet("/", () => { return "x"; });
app.Run();

static int Helper(int x) { return x; }
"#;
        let decls = extract(code).declarations;
        assert_eq!(decls.len(), 1, "{decls:?}");
        assert_eq!(decls[0].name, "Helper");
        assert_eq!(decls[0].kind, DeclKind::Method);
    }

    #[test]
    fn test_preprocessor_and_comments_ignored() {
        let code = r#"
#region Fields
class A {
    // public void Hidden() { }
    /* private int _gone; */
    #if DEBUG
    private string _s = "}";
    #endif
    public void Visible() { }
}
#endregion
"#;
        let decls = extract(code).declarations;
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["A", "_s", "Visible"]);
    }

    #[test]
    fn test_indexer_and_operator() {
        let code = r#"class V {
    public int this[int i] { get { return i; } }
    public static V operator +(V a, V b) => a;
}"#;
        let decls = extract(code).declarations;
        let indexer = find(&decls, "this[int i]");
        assert_eq!(indexer.kind, DeclKind::Property);
        assert_eq!(indexer.qualifier.as_deref(), Some("{ get; }"));

        let op = find(&decls, "operator +");
        assert_eq!(op.kind, DeclKind::Method);
        assert_eq!(op.ty.as_deref(), Some("V"));
    }

    #[test]
    fn test_razor_root_members() {
        let code = "private int _count;\npublic void Increment() { _count++; }\n";
        let plain = extract(code).declarations;
        assert_eq!(plain.len(), 1);

        let razor = extract_block(code, RootMembers::All).declarations;
        assert_eq!(razor.len(), 2);
        assert_eq!(razor[0].kind, DeclKind::Field);
        assert_eq!(razor[0].depth, 0);
    }
}
