//! Text scanning shared by the extractors.
//!
//! Extractors work on two views of the same file: the original text and a
//! masked copy in which comments and the contents of string literals are
//! replaced by spaces. Both have identical byte offsets, so structure is
//! found in the masked copy and verbatim text (default values, include
//! paths) is sliced from the original.

use std::ops::Range;

use super::{DeclKind, Extraction, Params};

/// Number of lines in `text`, counting an unterminated last line.
pub(crate) fn line_count(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    let newlines = bytecount::count(text.as_bytes(), b'\n');
    if text.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Byte offset to 1-indexed line lookup.
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    pub(crate) fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }

    /// Byte ranges of every physical line, without the trailing newline.
    pub(crate) fn ranges(&self, len: usize) -> Vec<Range<usize>> {
        self.starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = self.starts.get(i + 1).map_or(len, |next| next - 1);
                start..end.max(start)
            })
            .collect()
    }
}

// ============================================================================
// Masking
// ============================================================================

/// Comment and literal syntax of a language family.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MaskStyle {
    pub slash_comments: bool,
    pub hash_comments: bool,
    pub backtick_strings: bool,
    pub verbatim_strings: bool,
    pub triple_quotes: bool,
    pub regex_literals: bool,
}

impl MaskStyle {
    pub(crate) const C_LIKE: MaskStyle = MaskStyle {
        slash_comments: true,
        hash_comments: false,
        backtick_strings: false,
        verbatim_strings: false,
        triple_quotes: false,
        regex_literals: false,
    };

    pub(crate) const CSHARP: MaskStyle = MaskStyle {
        verbatim_strings: true,
        triple_quotes: true,
        ..MaskStyle::C_LIKE
    };

    pub(crate) const JAVASCRIPT: MaskStyle = MaskStyle {
        backtick_strings: true,
        regex_literals: true,
        ..MaskStyle::C_LIKE
    };

    pub(crate) const PYTHON: MaskStyle = MaskStyle {
        slash_comments: false,
        hash_comments: true,
        backtick_strings: false,
        verbatim_strings: false,
        triple_quotes: true,
        regex_literals: false,
    };
}

/// Masked text plus the spans of literals that cross a line break.
pub(crate) struct Masked {
    pub text: String,
    pub multiline_literals: Vec<Range<usize>>,
}

/// Replace comments and literal contents with spaces, keeping newlines,
/// quote characters, and byte offsets intact.
pub(crate) fn mask(text: &str, style: MaskStyle) -> Masked {
    let src = text.as_bytes();
    let n = src.len();
    let mut out = src.to_vec();
    let mut multiline_literals = Vec::new();
    let mut i = 0;

    while i < n {
        let b = src[i];
        let next = src.get(i + 1).copied();

        if style.slash_comments && b == b'/' && next == Some(b'/') {
            let end = find_byte(src, i, b'\n');
            blank(&mut out, i..end);
            i = end;
            continue;
        }
        if style.slash_comments && b == b'/' && next == Some(b'*') {
            let end = find_seq(src, i + 2, b"*/").map_or(n, |e| e + 2);
            blank(&mut out, i..end);
            i = end;
            continue;
        }
        if style.regex_literals && b == b'/' && regex_allowed(&out[..i]) {
            if let Some(close) = regex_close(src, i) {
                blank(&mut out, i + 1..close);
                i = close + 1;
                continue;
            }
        }
        if style.hash_comments && b == b'#' {
            let end = find_byte(src, i, b'\n');
            blank(&mut out, i..end);
            i = end;
            continue;
        }

        let is_quote = b == b'"' || b == b'\'' || (style.backtick_strings && b == b'`');
        if is_quote {
            let (body, end) = literal(src, i, style);
            if src[body.clone()].contains(&b'\n') {
                multiline_literals.push(i..end);
            }
            blank(&mut out, body);
            i = end.max(i + 1);
            continue;
        }

        i += 1;
    }

    let text = String::from_utf8(out)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned());
    Masked {
        text,
        multiline_literals,
    }
}

/// Locate the body of the literal opening at `start`.
///
/// Returns the content range and the offset just past the literal.
fn literal(src: &[u8], start: usize, style: MaskStyle) -> (Range<usize>, usize) {
    let n = src.len();
    let quote = src[start];

    if style.triple_quotes && quote != b'`' && src[start..].starts_with(&[quote, quote, quote]) {
        let delim = [quote; 3];
        let body = start + 3;
        let mut j = body;
        while j < n {
            if src[j] == b'\\' {
                j += 2;
                continue;
            }
            if src[j..].starts_with(&delim) {
                return (body..j, j + 3);
            }
            j += 1;
        }
        return (body..n, n);
    }

    let verbatim = style.verbatim_strings && quote == b'"' && is_verbatim_prefix(&src[..start]);
    let multiline = verbatim || quote == b'`';
    let body = start + 1;
    let mut j = body;

    while j < n {
        let c = src[j];
        if verbatim {
            if c == b'"' {
                if src.get(j + 1) == Some(&b'"') {
                    j += 2;
                    continue;
                }
                return (body..j, j + 1);
            }
        } else {
            if c == b'\\' {
                j += 2;
                continue;
            }
            if c == quote {
                return (body..j, j + 1);
            }
            // Unterminated single-line literal: stop at the line break.
            if c == b'\n' && !multiline {
                return (body..j, j);
            }
        }
        j += 1;
    }

    let end = j.min(n);
    (body.min(end)..end, end)
}

/// Bytes after which a `/` starts a regex literal rather than dividing.
const REGEX_PRECEDERS: &[u8] = b"(,=:[!&|?{};+-*%<>~^";

/// Keywords after which a `/` starts a regex literal.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "yield", "await",
];

/// Whether a `/` following the already masked bytes `before` sits where an
/// operand is expected.
fn regex_allowed(before: &[u8]) -> bool {
    let Some(last) = before.iter().rposition(|b| !matches!(b, b' ' | b'\t' | b'\r')) else {
        return true;
    };
    let c = before[last];
    if c == b'\n' || REGEX_PRECEDERS.contains(&c) {
        return true;
    }
    if !is_ident_byte(c) {
        return false;
    }
    let start = before[..=last]
        .iter()
        .rposition(|&b| !is_ident_byte(b))
        .map_or(0, |p| p + 1);
    std::str::from_utf8(&before[start..=last]).is_ok_and(|word| REGEX_KEYWORDS.contains(&word))
}

/// Offset of the `/` closing a regex literal that opens at `start`.
///
/// Regex literals never span lines; `None` means this `/` is not one.
fn regex_close(src: &[u8], start: usize) -> Option<usize> {
    let mut in_class = false;
    let mut j = start + 1;
    while j < src.len() {
        match src[j] {
            b'\\' => {
                j += 2;
                continue;
            }
            b'\n' => return None,
            b'[' => in_class = true,
            b']' => in_class = false,
            b'/' if !in_class => return Some(j),
            _ => {}
        }
        j += 1;
    }
    None
}

fn is_verbatim_prefix(before: &[u8]) -> bool {
    before.ends_with(b"@") || before.ends_with(b"@$") || before.ends_with(b"$@")
}

fn find_byte(src: &[u8], from: usize, byte: u8) -> usize {
    src[from..]
        .iter()
        .position(|&b| b == byte)
        .map_or(src.len(), |p| from + p)
}

fn find_seq(src: &[u8], from: usize, seq: &[u8]) -> Option<usize> {
    if from >= src.len() {
        return None;
    }
    src[from..]
        .windows(seq.len())
        .position(|w| w == seq)
        .map(|p| from + p)
}

fn blank(out: &mut [u8], range: Range<usize>) {
    for b in &mut out[range] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

/// Blank a line-aligned range of an already masked string.
pub(crate) fn blank_range(masked: &mut String, range: Range<usize>) {
    let replacement: String = masked.as_bytes()[range.clone()]
        .iter()
        .map(|&b| if b == b'\n' { '\n' } else { ' ' })
        .collect();
    masked.replace_range(range, &replacement);
}

/// Blank preprocessor lines (including `\` continuations) and return their
/// ranges so callers can read them from the original text.
pub(crate) fn take_preprocessor_lines(masked: &mut String) -> Vec<Range<usize>> {
    let lines = LineIndex::new(masked).ranges(masked.len());
    let mut directives = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        let first = lines[idx].clone();
        if masked[first.clone()].trim_start().starts_with('#') {
            let mut end = first.end;
            while masked[lines[idx].clone()].trim_end().ends_with('\\') && idx + 1 < lines.len() {
                idx += 1;
                end = lines[idx].end;
            }
            directives.push(first.start..end);
        }
        idx += 1;
    }

    for range in &directives {
        blank_range(masked, range.clone());
    }
    directives
}

// ============================================================================
// Snippets
// ============================================================================

/// A span of the file seen through both the original and masked text.
#[derive(Clone, Copy)]
pub(crate) struct Snippet<'a> {
    text: &'a str,
    masked: &'a str,
    lines: &'a LineIndex,
    start: usize,
    end: usize,
}

impl<'a> Snippet<'a> {
    pub(crate) fn new(
        text: &'a str,
        masked: &'a str,
        lines: &'a LineIndex,
        range: Range<usize>,
    ) -> Self {
        Self {
            text,
            masked,
            lines,
            start: range.start,
            end: range.end,
        }
    }

    pub(crate) fn original(&self) -> &'a str {
        &self.text[self.start..self.end]
    }

    pub(crate) fn masked(&self) -> &'a str {
        &self.masked[self.start..self.end]
    }

    /// Masked text following the snippet, up to the end of the file.
    pub(crate) fn rest(&self) -> &'a str {
        &self.masked[self.end..]
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.masked().trim().is_empty()
    }

    /// Line of the first non-blank character.
    pub(crate) fn line(&self) -> usize {
        let masked = self.masked();
        let lead = masked.len() - masked.trim_start().len();
        self.lines.line_of(self.start + lead)
    }

    /// Sub-snippet from a relative byte range.
    pub(crate) fn slice(&self, range: Range<usize>) -> Snippet<'a> {
        let end = (self.start + range.end).min(self.end);
        let start = (self.start + range.start).min(end);
        Snippet { start, end, ..*self }
    }

    /// The snippet without its first `offset` bytes.
    pub(crate) fn after(&self, offset: usize) -> Snippet<'a> {
        self.slice(offset..self.end - self.start)
    }

    /// Candidate sub-snippets starting at each line, shortest first.
    ///
    /// Only candidates with balanced brackets are kept, found in one
    /// backwards pass. At most [`MAX_CANDIDATES`] of the shortest are
    /// returned, followed by the longest one.
    pub(crate) fn suffixes(&self) -> Vec<Snippet<'a>> {
        let bytes = self.masked().as_bytes();
        // Closers not yet matched by an opener, per bracket kind.
        let mut owed = [0i32; 3];
        let mut starts = Vec::new();

        for i in (0..bytes.len()).rev() {
            if let Some((slot, delta)) = bracket(bytes[i]) {
                owed[slot] -= delta;
                // An opener without its closer; no longer suffix can balance.
                if owed[slot] < 0 {
                    break;
                }
            }
            let line_start = i == 0 || bytes[i - 1] == b'\n';
            if line_start && owed == [0, 0, 0] {
                starts.push(i);
            }
        }

        if starts.len() > MAX_CANDIDATES {
            let longest = starts[starts.len() - 1];
            starts.truncate(MAX_CANDIDATES);
            starts.push(longest);
        }

        starts
            .into_iter()
            .map(|s| self.slice(s..bytes.len()))
            .filter(|s| !s.is_blank())
            .collect()
    }
}

/// Most line-suffixes tried before falling back to the whole snippet.
pub(crate) const MAX_CANDIDATES: usize = 64;

/// Classify the shortest line-suffix of `snippet` that `classify` accepts.
///
/// Leading lines that belong to something else (attributes, macros,
/// statements without a terminator) are skipped this way.
pub(crate) fn first_match<'a, T>(
    snippet: Snippet<'a>,
    mut classify: impl FnMut(Snippet<'a>) -> Option<T>,
) -> Option<T> {
    snippet.suffixes().into_iter().find_map(&mut classify)
}

// ============================================================================
// Brace walking
// ============================================================================

/// What encloses the declarations currently being scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Scope {
    Root,
    Namespace,
    Type { name: String, kind: DeclKind },
}

impl Scope {
    pub(crate) fn is_type(&self) -> bool {
        matches!(self, Scope::Type { .. })
    }

    pub(crate) fn type_name(&self) -> Option<&str> {
        match self {
            Scope::Type { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }
}

pub(crate) struct Context<'a> {
    /// Depth assigned to declarations found here.
    pub depth: usize,
    pub scope: &'a Scope,
}

/// Meaning of an opening brace.
pub(crate) enum Block {
    /// Namespace or type body; members are one level deeper.
    Container(Scope),
    /// Linkage blocks such as `extern "C"`; members stay at this depth.
    Transparent,
    /// Braces inside a statement (initializers, import lists).
    Inline,
    /// Function bodies and anything else that is not scanned.
    Body,
}

/// Side effect of a `;`-terminated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    None,
    /// File-scoped namespace: everything after it is nested one level.
    NestScope,
}

/// Language rules plugged into [`scan_braces`].
pub(crate) trait BraceRules {
    fn open_block(&mut self, header: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Block;

    fn statement(&mut self, stmt: Snippet<'_>, cx: &Context<'_>, out: &mut Extraction) -> Effect;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Collect,
    Inline,
    Body,
}

struct Frame {
    kind: FrameKind,
    scope: Scope,
    depth: usize,
    saved_paren: usize,
}

impl Frame {
    fn collect(scope: Scope, depth: usize) -> Self {
        Self {
            kind: FrameKind::Collect,
            scope,
            depth,
            saved_paren: 0,
        }
    }

    fn skipped(kind: FrameKind) -> Self {
        Self {
            kind,
            scope: Scope::Root,
            depth: 0,
            saved_paren: 0,
        }
    }
}

/// Walk a brace-delimited file, handing block headers and statements found
/// in namespace, type, and file scope to `rules`.
pub(crate) fn scan_braces<R: BraceRules>(
    text: &str,
    masked: &str,
    rules: &mut R,
    out: &mut Extraction,
) {
    let lines = LineIndex::new(text);
    let mut stack = vec![Frame::collect(Scope::Root, 0)];
    let mut start = 0;
    let mut paren = 0usize;

    for (i, &b) in masked.as_bytes().iter().enumerate() {
        match b {
            b'(' | b'[' => paren += 1,
            b')' | b']' => paren = paren.saturating_sub(1),
            b'{' => {
                let top = &stack[stack.len() - 1];
                let mut frame = match top.kind {
                    FrameKind::Collect if paren == 0 => {
                        let header = Snippet::new(text, masked, &lines, start..i);
                        let cx = Context {
                            depth: top.depth,
                            scope: &top.scope,
                        };
                        match rules.open_block(header, &cx, out) {
                            Block::Container(scope) => Frame::collect(scope, top.depth + 1),
                            Block::Transparent => Frame::collect(top.scope.clone(), top.depth),
                            Block::Inline => Frame::skipped(FrameKind::Inline),
                            Block::Body => Frame::skipped(FrameKind::Body),
                        }
                    }
                    FrameKind::Collect | FrameKind::Inline => Frame::skipped(FrameKind::Inline),
                    FrameKind::Body => Frame::skipped(FrameKind::Body),
                };
                frame.saved_paren = paren;
                paren = 0;
                if frame.kind != FrameKind::Inline {
                    start = i + 1;
                }
                stack.push(frame);
            }
            b'}' => {
                if stack.len() > 1 {
                    if let Some(frame) = stack.pop() {
                        paren = frame.saved_paren;
                        if frame.kind != FrameKind::Inline {
                            start = i + 1;
                        }
                    }
                } else {
                    start = i + 1;
                }
            }
            b';' if paren == 0 => {
                let top = &stack[stack.len() - 1];
                let kind = top.kind;
                if kind == FrameKind::Collect {
                    let stmt = Snippet::new(text, masked, &lines, start..i);
                    let cx = Context {
                        depth: top.depth,
                        scope: &top.scope,
                    };
                    if rules.statement(stmt, &cx, out) == Effect::NestScope {
                        if let Some(top) = stack.last_mut() {
                            top.depth += 1;
                            top.scope = Scope::Namespace;
                        }
                    }
                }
                if kind != FrameKind::Inline {
                    start = i + 1;
                }
            }
            _ => {}
        }
    }

    // Input may end without a final `;`.
    let top = &stack[stack.len() - 1];
    if top.kind == FrameKind::Collect && start < masked.len() {
        let stmt = Snippet::new(text, masked, &lines, start..masked.len());
        if !stmt.is_blank() {
            let cx = Context {
                depth: top.depth,
                scope: &top.scope,
            };
            rules.statement(stmt, &cx, out);
        }
    }
}

// ============================================================================
// Structure helpers
// ============================================================================

/// Whether `()`, `[]` and `{}` are balanced and never close early.
pub(crate) fn brackets_balanced(s: &str) -> bool {
    let mut depths = [0i32; 3];
    for b in s.bytes() {
        let Some((slot, delta)) = bracket(b) else {
            continue;
        };
        depths[slot] += delta;
        if depths[slot] < 0 {
            return false;
        }
    }
    depths == [0, 0, 0]
}

/// Kind slot and depth change of a bracket byte.
fn bracket(b: u8) -> Option<(usize, i32)> {
    match b {
        b'(' => Some((0, 1)),
        b')' => Some((0, -1)),
        b'[' => Some((1, 1)),
        b']' => Some((1, -1)),
        b'{' => Some((2, 1)),
        b'}' => Some((2, -1)),
        _ => None,
    }
}

fn angles_balanced(s: &str) -> bool {
    let mut depth = 0i32;
    for b in s.bytes() {
        match b {
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// First offset at bracket depth zero where `pred` holds.
///
/// With `angles`, `<...>` also counts as nesting (generic arguments).
pub(crate) fn find_top_level(
    masked: &str,
    angles: bool,
    pred: impl Fn(&[u8], usize) -> bool,
) -> Option<usize> {
    let bytes = masked.as_bytes();
    let mut depth = 0usize;
    let mut angle = 0usize;

    for i in 0..bytes.len() {
        if depth == 0 && angle == 0 && pred(bytes, i) {
            return Some(i);
        }
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'<' if angles && depth == 0 => angle += 1,
            b'>' if angles && depth == 0 && angle > 0 => {
                if !matches!(i.checked_sub(1).map(|p| bytes[p]), Some(b'=') | Some(b'-')) {
                    angle -= 1;
                }
            }
            _ => {}
        }
    }
    None
}

/// Predicate for [`find_top_level`]: `(`.
pub(crate) fn is_open_paren(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'('
}

/// Predicate for [`find_top_level`]: a plain `=` assignment.
pub(crate) fn is_assign(bytes: &[u8], i: usize) -> bool {
    if bytes[i] != b'=' {
        return false;
    }
    if matches!(bytes.get(i + 1), Some(b'=') | Some(b'>')) {
        return false;
    }
    let prev = i.checked_sub(1).map(|p| bytes[p]);
    !matches!(
        prev,
        Some(
            b'=' | b'!' | b'<' | b'>' | b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'^'
                | b'?'
        )
    )
}

/// Predicate for [`find_top_level`]: `=>`.
pub(crate) fn is_arrow(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'=' && bytes.get(i + 1) == Some(&b'>')
}

/// Offset of the bracket closing the one at `open`.
pub(crate) fn matching_close(
    masked: &str,
    open: usize,
    open_byte: u8,
    close_byte: u8,
) -> Option<usize> {
    let bytes = masked.as_bytes();
    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if b == open_byte {
            depth += 1;
        } else if b == close_byte {
            depth = depth.checked_sub(1)?;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split on commas at bracket depth zero.
pub(crate) fn split_top_level(masked: &str, angles: bool) -> Vec<Range<usize>> {
    let mut pieces = Vec::new();
    let mut from = 0;
    while from <= masked.len() {
        match find_top_level(&masked[from..], angles, |b, i| b[i] == b',') {
            Some(comma) => {
                pieces.push(from..from + comma);
                from += comma + 1;
            }
            None => {
                pieces.push(from..masked.len());
                break;
            }
        }
    }
    pieces
}

/// Parameters between the parentheses at `open` and `close` (relative to
/// the snippet), verbatim from the original text.
pub(crate) fn params(snippet: Snippet<'_>, open: usize, close: usize, angles: bool) -> Params {
    let masked = snippet.masked();
    let original = snippet.original();
    let close = close.min(masked.len());
    if open + 1 > close {
        return Params::new();
    }
    let inner_masked = &masked[open + 1..close];
    let inner = &original[open + 1..close];

    split_top_level(inner_masked, angles)
        .into_iter()
        .map(|r| squash(&inner[r]))
        .filter(|p| !p.is_empty())
        .collect()
}

/// Collapse whitespace runs to single spaces and trim.
pub(crate) fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

pub(crate) fn is_identifier(s: &str) -> bool {
    match s.as_bytes().first() {
        Some(first) if !first.is_ascii_digit() => s.bytes().all(is_ident_byte),
        _ => false,
    }
}

/// Trailing name of `s`: identifier bytes plus any of `extra`.
///
/// Returns the offset where the name starts.
pub(crate) fn trailing_name<'s>(s: &'s str, extra: &[u8]) -> Option<(usize, &'s str)> {
    let s = s.trim_end();
    let bytes = s.as_bytes();
    let mut start = bytes.len();
    while start > 0 && (is_ident_byte(bytes[start - 1]) || extra.contains(&bytes[start - 1])) {
        start -= 1;
    }
    let name = &s[start..];
    let first = name.bytes().next()?;
    if first.is_ascii_digit() {
        return None;
    }
    Some((start, name))
}

/// Drop a trailing `<...>` group (generic arguments before a parameter list).
pub(crate) fn strip_generic_suffix(s: &str) -> &str {
    let trimmed = s.trim_end();
    if !trimmed.ends_with('>') {
        return trimmed;
    }
    let bytes = trimmed.as_bytes();
    let mut depth = 0usize;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b'>' => depth += 1,
            b'<' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return trimmed[..i].trim_end();
                }
            }
            _ => {}
        }
    }
    trimmed
}

/// Remove leading whole words found in `words`.
pub(crate) fn strip_leading_words<'s>(mut s: &'s str, words: &[&str]) -> &'s str {
    loop {
        let trimmed = s.trim_start();
        let word_end = trimmed
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len());
        if word_end > 0 && words.contains(&&trimmed[..word_end]) {
            s = &trimmed[word_end..];
        } else {
            return trimmed;
        }
    }
}

/// Offset past any leading `[...]` attribute groups.
pub(crate) fn skip_attributes(masked: &str) -> usize {
    let bytes = masked.as_bytes();
    let mut i = 0;
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i < bytes.len() && bytes[i] == b'[' {
            match matching_close(masked, i, b'[', b']') {
                Some(close) => i = close + 1,
                None => return i,
            }
        } else {
            return i;
        }
    }
}

/// Whether `ty` reads as a type: identifiers, qualifiers, generic
/// arguments, array/pointer/nullable markers, and tuples.
pub(crate) fn looks_like_type(ty: &str) -> bool {
    let ty = ty.trim();
    let Some(first) = ty.bytes().next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == b'_' || first == b'(') {
        return false;
    }
    ty.bytes()
        .all(|b| is_ident_byte(b) || b" .:<>,[]()?*&".contains(&b))
        && brackets_balanced(ty)
        && angles_balanced(ty)
}

/// Split `type name` (already squashed) into its parts.
///
/// Returns `None` when there is no identifier at the end. The type is
/// `None` when nothing precedes the name.
pub(crate) fn split_type_and_name(text: &str) -> Option<(Option<String>, String)> {
    let text = strip_array_suffix(text.trim());
    let (start, name) = trailing_name(text, b"@")?;
    let name = name.trim_start_matches('@');
    if !is_identifier(name) {
        return None;
    }
    let ty = text[..start].trim();
    let ty = (!ty.is_empty()).then(|| tidy_type(ty));
    Some((ty, name.to_string()))
}

/// Drop trailing `[...]` groups from a declarator (`buf[16]`).
pub(crate) fn strip_array_suffix(s: &str) -> &str {
    let mut s = s.trim_end();
    while s.ends_with(']') {
        match s.rfind('[') {
            Some(open) => s = s[..open].trim_end(),
            None => break,
        }
    }
    s
}

/// Normalize spacing around pointer and reference markers.
pub(crate) fn tidy_type(ty: &str) -> String {
    let mut out = String::with_capacity(ty.len());
    for word in ty.split_whitespace() {
        if !out.is_empty() && !word.starts_with(['*', '&']) {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
