//! Server-script scanner.
//!
//! A shallow lexical pass walks the source once with exact quote, comment,
//! and bracket tracking. It yields a table of string literals, a table of
//! call spans (each carrying its dotted callee chain), and a masked copy of
//! the source for the token-level rules. Every check runs over those tables.
//! An unterminated string or unbalanced bracket produces a single
//! parse-error violation and no other checks run.

use crate::models::rules;
use crate::models::Violation;
use crate::utils::LineIndex;
use regex::Regex;
use std::sync::LazyLock;

/// An opening angle bracket followed by a letter, optionally a closing tag.
static MARKUP_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z]").unwrap());

/// A `{name}` placeholder. `{{` is the escaped brace and never matches;
/// `{}` and `{0}` are positional and never match.
static NAMED_PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^{])\{[A-Za-z_][A-Za-z0-9_]*[^}]*\}").unwrap());

/// `<` and `&lt;` on the same line, in either order.
static CUSTOM_ESCAPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*&lt;|&lt;.*<").unwrap());

static DISPLAY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.display_name_with_default_escaped\b").unwrap());

/// A string literal span. `prefix_start` covers prefix letters such as `r`
/// or `b`, `start` is the opening quote, and `end` is one past the closing
/// quote.
struct Literal {
    prefix_start: usize,
    start: usize,
    body_start: usize,
    body_end: usize,
    end: usize,
}

/// A closed parenthesized span. The callee chain is `text[callee_start..open]`
/// and may be empty for grouping parens.
struct Call {
    callee_start: usize,
    open: usize,
    close: usize,
}

struct Lexed {
    literals: Vec<Literal>,
    calls: Vec<Call>,
    masked: String,
}

/// A `.format(` call site with its resolved receiver.
struct FormatSite {
    receiver_start: usize,
    /// Index into the literal table when the receiver is a bare string.
    receiver_literal: Option<usize>,
    open: usize,
    close: usize,
}

/// Scan a server script for unsafe markup handling.
pub fn scan(text: &str) -> Vec<Violation> {
    let index = LineIndex::new(text);
    let lexed = match lex(text) {
        Ok(lexed) => lexed,
        Err(offset) => {
            let line = index.line_of(offset);
            return vec![Violation::new(
                &rules::PYTHON_PARSE_ERROR,
                line,
                Some(index.column_of(offset)),
                index.line_text(text, line).trim(),
            )];
        }
    };

    let mut violations = Vec::new();
    check_custom_escape(text, &index, &mut violations);

    let mut structural = Vec::new();
    check_concat_and_interpolation(text, &index, &lexed, &mut structural);
    check_display_name(text, &index, &lexed, &mut structural);
    check_format_rules(text, &index, &lexed, &mut structural);

    // `__repr__` bodies legitimately build `<Name ...>` strings.
    let spans = repr_spans(&lexed.masked);
    structural.retain(|v| !spans.iter().any(|&(first, last)| first <= v.line && v.line <= last));
    violations.append(&mut structural);
    violations
}

/// Single pass over the source producing the literal and call tables.
///
/// Returns the byte offset of the offending construct on failure: the
/// opening quote of an unterminated string, or the unbalanced bracket.
fn lex(text: &str) -> Result<Lexed, usize> {
    let bytes = text.as_bytes();
    let mut masked = bytes.to_vec();
    let mut literals = Vec::new();
    let mut calls = Vec::new();
    let mut stack: Vec<(u8, usize, usize)> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                let start = i;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                mask(&mut masked, start, i);
            }
            quote @ (b'\'' | b'"') => {
                let triple = bytes.len() - i >= 3 && bytes[i + 1] == quote && bytes[i + 2] == quote;
                let quote_len = if triple { 3 } else { 1 };
                let start = i;
                let body_start = i + quote_len;
                let close = find_string_end(bytes, body_start, quote, triple).ok_or(start)?;
                literals.push(Literal {
                    prefix_start: string_prefix_start(bytes, start),
                    start,
                    body_start,
                    body_end: close,
                    end: close + quote_len,
                });
                mask(&mut masked, body_start, close);
                i = close + quote_len;
            }
            open @ (b'(' | b'[' | b'{') => {
                let callee_start = if open == b'(' {
                    callee_chain_start(bytes, i)
                } else {
                    i
                };
                stack.push((open, i, callee_start));
                i += 1;
            }
            close @ (b')' | b']' | b'}') => {
                let Some((open, open_idx, callee_start)) = stack.pop() else {
                    return Err(i);
                };
                let expected = match open {
                    b'(' => b')',
                    b'[' => b']',
                    _ => b'}',
                };
                if close != expected {
                    return Err(i);
                }
                if open == b'(' {
                    calls.push(Call {
                        callee_start,
                        open: open_idx,
                        close: i,
                    });
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    if let Some(&(_, open_idx, _)) = stack.first() {
        return Err(open_idx);
    }
    Ok(Lexed {
        literals,
        calls,
        masked: String::from_utf8_lossy(&masked).into_owned(),
    })
}

/// Offset of the closing quote, or `None` when the string never closes.
/// A bare newline terminates (and fails) a non-triple string.
fn find_string_end(bytes: &[u8], from: usize, quote: u8, triple: bool) -> Option<usize> {
    let mut i = from;
    let mut escaped = false;
    while i < bytes.len() {
        let b = bytes[i];
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == b'\n' && !triple {
            return None;
        } else if b == quote
            && (!triple || (bytes.len() - i >= 3 && bytes[i + 1] == quote && bytes[i + 2] == quote))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Start of the string-prefix letters (`r`, `b`, `f`, `u`, up to two)
/// preceding the quote at `quote_idx`, or `quote_idx` when there are none.
fn string_prefix_start(bytes: &[u8], quote_idx: usize) -> usize {
    let mut p = quote_idx;
    while p > 0
        && quote_idx - p < 2
        && matches!(
            bytes[p - 1],
            b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F'
        )
    {
        p -= 1;
    }
    let boundary = p == 0 || !(bytes[p - 1].is_ascii_alphanumeric() || bytes[p - 1] == b'_');
    if p < quote_idx && boundary {
        p
    } else {
        quote_idx
    }
}

/// Start of the dotted identifier chain ending just before `open`.
fn callee_chain_start(bytes: &[u8], open: usize) -> usize {
    let mut p = open;
    while p > 0 && (bytes[p - 1].is_ascii_alphanumeric() || bytes[p - 1] == b'_' || bytes[p - 1] == b'.')
    {
        p -= 1;
    }
    p
}

fn mask(masked: &mut [u8], from: usize, to: usize) {
    for b in &mut masked[from..to] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

/// Offset of the first markup tag inside the literal body. Regex named
/// groups (`(?P<name>`) use `<` without meaning markup.
fn markup_tag_offset(text: &str, literal: &Literal) -> Option<usize> {
    let body = &text[literal.body_start..literal.body_end];
    if body.contains("(?P<") {
        return None;
    }
    MARKUP_TAG_RE.find(body).map(|m| literal.body_start + m.start())
}

fn prev_non_space(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i > 0 {
        i -= 1;
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' | b'\\' => continue,
            _ => return Some(i),
        }
    }
    None
}

fn next_non_space(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' | b'\\' => i += 1,
            _ => return Some(i),
        }
    }
    None
}

fn check_custom_escape(text: &str, index: &LineIndex, out: &mut Vec<Violation>) {
    for m in CUSTOM_ESCAPE_RE.find_iter(text) {
        let line = index.line_of(m.start());
        out.push(Violation::new(
            &rules::PYTHON_CUSTOM_ESCAPE,
            line,
            Some(index.column_of(m.start())),
            index.line_text(text, line).trim(),
        ));
    }
}

/// A markup-carrying literal whose nearest non-space neighbor is `+` is
/// concatenation; `%` is interpolation. Both can apply to one literal.
fn check_concat_and_interpolation(
    text: &str,
    index: &LineIndex,
    lexed: &Lexed,
    out: &mut Vec<Violation>,
) {
    let bytes = text.as_bytes();
    for literal in &lexed.literals {
        let Some(tag) = markup_tag_offset(text, literal) else {
            continue;
        };
        let before = prev_non_space(bytes, literal.prefix_start).map(|p| bytes[p]);
        let after = next_non_space(bytes, literal.end).map(|p| bytes[p]);
        let line = index.line_of(tag);
        let start_line = index.line_of(literal.start);
        let column = Some(index.column_of(literal.prefix_start));
        let context = index.line_text(text, line).trim();
        if before == Some(b'+') || after == Some(b'+') {
            out.push(Violation::spanning(
                &rules::PYTHON_CONCAT_HTML,
                line,
                start_line,
                column,
                context,
            ));
        }
        if before == Some(b'%') || after == Some(b'%') {
            out.push(Violation::spanning(
                &rules::PYTHON_INTERPOLATE_HTML,
                line,
                start_line,
                column,
                context,
            ));
        }
    }
}

fn check_display_name(text: &str, index: &LineIndex, lexed: &Lexed, out: &mut Vec<Violation>) {
    for m in DISPLAY_NAME_RE.find_iter(&lexed.masked) {
        let line = index.line_of(m.start());
        out.push(Violation::new(
            &rules::PYTHON_DEPRECATED_DISPLAY_NAME,
            line,
            Some(index.column_of(m.start())),
            index.line_text(text, line).trim(),
        ));
    }
}

/// Resolve every `.format(` call to a site with its receiver span.
fn format_sites(text: &str, lexed: &Lexed) -> Vec<FormatSite> {
    let bytes = text.as_bytes();
    let mut sites = Vec::new();
    for call in &lexed.calls {
        let callee = &text[call.callee_start..call.open];
        if !callee.ends_with(".format") {
            continue;
        }
        let mut site = FormatSite {
            receiver_start: call.callee_start,
            receiver_literal: None,
            open: call.open,
            close: call.close,
        };
        if callee == ".format" {
            // The receiver is whatever the leading dot attaches to.
            match prev_non_space(bytes, call.callee_start) {
                Some(p) if bytes[p] == b'\'' || bytes[p] == b'"' => {
                    if let Some(i) = lexed.literals.iter().position(|l| l.end == p + 1) {
                        site.receiver_literal = Some(i);
                        site.receiver_start = lexed.literals[i].prefix_start;
                    }
                }
                Some(p) if bytes[p] == b')' => {
                    if let Some(receiver) = lexed.calls.iter().find(|c| c.close == p) {
                        site.receiver_start = receiver.callee_start;
                    }
                }
                _ => {}
            }
        }
        sites.push(site);
    }
    sites
}

fn check_format_rules(text: &str, index: &LineIndex, lexed: &Lexed, out: &mut Vec<Violation>) {
    let sites = format_sites(text, lexed);

    // A bare literal receiver with a named placeholder must become
    // HTML(...) or Text(...) before format() is called on it.
    for site in &sites {
        let Some(li) = site.receiver_literal else {
            continue;
        };
        let literal = &lexed.literals[li];
        if NAMED_PLACEHOLDER_RE.is_match(&text[literal.body_start..literal.body_end]) {
            let line = index.line_of(literal.start);
            out.push(Violation::new(
                &rules::PYTHON_REQUIRES_HTML_OR_TEXT,
                line,
                Some(index.column_of(literal.prefix_start)),
                index.line_text(text, line).trim(),
            ));
        }
    }

    // format() opened inside the parentheses of HTML() or Text().
    for call in &lexed.calls {
        let callee = &text[call.callee_start..call.open];
        if callee != "HTML" && callee != "Text" {
            continue;
        }
        if sites.iter().any(|s| s.open > call.open && s.open < call.close) {
            let line = index.line_of(call.callee_start);
            out.push(Violation::new(
                &rules::PYTHON_CLOSE_BEFORE_FORMAT,
                line,
                Some(index.column_of(call.callee_start)),
                index.line_text(text, line).trim(),
            ));
        }
    }

    // Markup literals inside an outermost format() territory must sit
    // inside an HTML() or Text() wrapper.
    for literal in &lexed.literals {
        let Some(tag) = markup_tag_offset(text, literal) else {
            continue;
        };
        let in_outer_territory = sites.iter().enumerate().any(|(i, site)| {
            let nested = sites.iter().enumerate().any(|(j, other)| {
                j != i && other.receiver_start <= site.open && site.open < other.close
            });
            !nested && literal.start >= site.receiver_start && literal.end <= site.close
        });
        if !in_outer_territory {
            continue;
        }
        let wrapped = lexed.calls.iter().any(|c| {
            let callee = &text[c.callee_start..c.open];
            (callee == "HTML" || callee == "Text") && c.open < literal.start && literal.end <= c.close
        });
        if wrapped {
            continue;
        }
        let line = index.line_of(tag);
        let start_line = index.line_of(literal.start);
        out.push(Violation::spanning(
            &rules::PYTHON_WRAP_HTML,
            line,
            start_line,
            Some(index.column_of(literal.prefix_start)),
            index.line_text(text, line).trim(),
        ));
    }
}

/// 1-based inclusive line spans of `def __repr__` blocks, found by
/// indentation on the masked source.
fn repr_spans(masked: &str) -> Vec<(usize, usize)> {
    let lines: Vec<&str> = masked.lines().collect();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let trimmed = lines[i].trim_start();
        if trimmed.starts_with("def __repr__") {
            let indent = lines[i].len() - trimmed.len();
            let mut j = i + 1;
            while j < lines.len() {
                let t = lines[j].trim_start();
                if !t.is_empty() && lines[j].len() - t.len() <= indent {
                    break;
                }
                j += 1;
            }
            spans.push((i + 1, j));
            i = j;
        } else {
            i += 1;
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(violations: &[Violation]) -> Vec<&'static str> {
        violations.iter().map(|v| v.rule.id).collect()
    }

    fn sorted_ids(text: &str) -> Vec<&'static str> {
        let mut violations = scan(text);
        violations.sort_by_key(|v| v.sort_key());
        ids(&violations)
    }

    #[test]
    fn test_plain_markup_assignment_is_not_flagged() {
        assert!(scan("msg = '<span></span>'\n").is_empty());
        assert!(scan("greeting = 'hello'\n").is_empty());
    }

    #[test]
    fn test_concat_with_markup_is_flagged_per_literal() {
        let violations = scan("banner = 'safe' + '<b>' + name\n");
        assert_eq!(ids(&violations), vec!["python-concat-html"]);
        assert_eq!(violations[0].line, 1);

        let violations = scan("page = '<div>' + body + '</div>'\n");
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_interpolation_with_markup_is_flagged() {
        let violations = scan("link = '<a href=\"%s\">' % url\n");
        assert_eq!(ids(&violations), vec!["python-interpolate-html"]);
        assert!(scan("label = '%s records' % count\n").is_empty());
    }

    #[test]
    fn test_regex_named_group_is_not_markup() {
        assert!(scan("pattern = r'(?P<slug>[^/]+)' + suffix\n").is_empty());
    }

    #[test]
    fn test_custom_escape_is_flagged() {
        let violations = scan("cleaned = value.replace('<', '&lt;')\n");
        assert_eq!(ids(&violations), vec!["python-custom-escape"]);
    }

    #[test]
    fn test_deprecated_display_name_attribute() {
        let violations = scan("title = block.display_name_with_default_escaped\n");
        assert_eq!(ids(&violations), vec!["python-deprecated-display-name"]);
        assert!(scan("note = 'use .display_name_with_default_escaped'\n").is_empty());
    }

    #[test]
    fn test_wrapped_format_chain_is_safe() {
        assert!(scan("out = HTML('<p>{}</p>').format(x)\n").is_empty());
        assert!(scan("out = Text('{a}').format(a=HTML('<b>'))\n").is_empty());
    }

    #[test]
    fn test_format_closed_inside_wrapper_is_flagged() {
        let violations = scan("out = HTML('<p>{}</p>'.format(name))\n");
        assert_eq!(ids(&violations), vec!["python-close-before-format"]);

        let violations = scan("li = Text('{}'.format(n))\n");
        assert_eq!(ids(&violations), vec!["python-close-before-format"]);
    }

    #[test]
    fn test_named_placeholder_receiver_requires_wrapper() {
        let violations = scan("greeting = '{name}!'.format(name=user)\n");
        assert_eq!(ids(&violations), vec!["python-requires-html-or-text"]);
        assert!(scan("greeting = '{}!'.format(user)\n").is_empty());
        assert!(scan("greeting = '{0}!'.format(user)\n").is_empty());
    }

    #[test]
    fn test_unsafe_wrapper_nesting_is_flagged_twice() {
        assert_eq!(
            sorted_ids("out = HTML('<p>{name}</p>'.format(name=name))\n"),
            vec!["python-close-before-format", "python-requires-html-or-text"]
        );
    }

    #[test]
    fn test_unwrapped_markup_inside_format_territory() {
        assert_eq!(
            sorted_ids("out = '{a}'.format(a='<b>bold</b>')\n"),
            vec!["python-requires-html-or-text", "python-wrap-html"]
        );
    }

    #[test]
    fn test_multiline_literal_reports_tag_line_and_opening_line() {
        let text = "template = \"\"\"\n<div>{title}</div>\n\"\"\".format(title=x)\n";
        let mut violations = scan(text);
        violations.sort_by_key(|v| v.sort_key());
        assert_eq!(
            ids(&violations),
            vec!["python-requires-html-or-text", "python-wrap-html"]
        );
        assert_eq!(violations[0].line, 1);
        assert_eq!(violations[1].line, 2);
        assert_eq!(violations[1].start_line, 1);
    }

    #[test]
    fn test_parse_error_aborts_all_checks() {
        let violations = scan("msg = HTML('<span></span>'\n");
        assert_eq!(ids(&violations), vec!["python-parse-error"]);

        let violations = scan("title = 'unterminated\n");
        assert_eq!(ids(&violations), vec!["python-parse-error"]);
    }

    #[test]
    fn test_comment_quotes_do_not_break_lexing() {
        let text = "# don't flag this line\nout = '<b>' + tail\n";
        let violations = scan(text);
        assert_eq!(ids(&violations), vec!["python-concat-html"]);
        assert_eq!(violations[0].line, 2);
    }

    #[test]
    fn test_repr_bodies_are_excluded() {
        let text = "\
class Tag:
    def __repr__(self):
        return '<Tag %s>' % self.name

    def render(self):
        return '<b>%s</b>' % self.name
";
        let violations = scan(text);
        assert_eq!(ids(&violations), vec!["python-interpolate-html"]);
        assert_eq!(violations[0].line, 6);
    }

    #[test]
    fn test_disable_pragma_applies() {
        let text = "\
# xss-lint: disable=python-interpolate-html
out = '<b>%s</b>' % name
";
        let violations =
            crate::linters::scan(crate::linters::ArtifactKind::ServerScript, text);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].disabled);
    }
}
