//! Browser-script scanner.
//!
//! Each rule family is a data-described matcher: a trigger pattern over
//! method calls plus a safety classifier for the argument or the receiver.
//! Classification is lexical; when in doubt a construct is treated as
//! unsafe.

use crate::linters::find_balanced_end;
use crate::models::rules::{self, Rule};
use crate::models::Violation;
use crate::utils::LineIndex;
use regex::Regex;
use std::sync::LazyLock;

const LINE_COMMENT_DELIM: &str = "//";

/// How a matched call is classified as safe or unsafe.
enum SafetyCheck {
    /// Inspect the text between the call's parentheses.
    Argument(fn(&str) -> bool),
    /// Inspect the line text leading up to the call.
    Caller(fn(&str) -> bool),
    /// Every match is a violation.
    Never,
}

struct CallFamily {
    rule: &'static Rule,
    /// Pipe-delimited method names, e.g. "append" or "after|before".
    methods: &'static str,
    /// Receiver prefix whose calls are known safe, e.g. "HtmlUtils".
    safe_receiver: &'static str,
    safety: SafetyCheck,
}

static CALL_FAMILIES: &[CallFamily] = &[
    CallFamily {
        rule: &rules::JAVASCRIPT_JQUERY_APPEND,
        methods: "append",
        safe_receiver: "HtmlUtils",
        safety: SafetyCheck::Argument(is_jquery_argument_safe),
    },
    CallFamily {
        rule: &rules::JAVASCRIPT_JQUERY_PREPEND,
        methods: "prepend",
        safe_receiver: "HtmlUtils",
        safety: SafetyCheck::Argument(is_jquery_argument_safe),
    },
    CallFamily {
        rule: &rules::JAVASCRIPT_JQUERY_INSERTION,
        methods: "unwrap|wrap|wrapAll|wrapInner|after|before|replaceAll|replaceWith",
        safe_receiver: "HtmlUtils",
        safety: SafetyCheck::Argument(is_jquery_argument_safe),
    },
    CallFamily {
        rule: &rules::JAVASCRIPT_JQUERY_INSERT_INTO_TARGET,
        methods: "appendTo|prependTo|insertAfter|insertBefore",
        safe_receiver: "HtmlUtils",
        safety: SafetyCheck::Caller(is_jquery_insert_caller_safe),
    },
    CallFamily {
        rule: &rules::JAVASCRIPT_JQUERY_HTML,
        methods: "html",
        safe_receiver: "HtmlUtils",
        safety: SafetyCheck::Argument(is_jquery_html_argument_safe),
    },
    CallFamily {
        rule: &rules::JAVASCRIPT_INTERPOLATE,
        methods: "interpolate",
        safe_receiver: "StringUtils",
        safety: SafetyCheck::Never,
    },
    CallFamily {
        rule: &rules::JAVASCRIPT_ESCAPE,
        methods: "escape",
        safe_receiver: "_",
        safety: SafetyCheck::Never,
    },
];

static CALL_TRIGGERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    CALL_FAMILIES
        .iter()
        .map(|family| Regex::new(&format!(r"(?:{})\(", family.methods)).unwrap())
        .collect()
});

static SINGLE_IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[_$a-zA-Z][_$a-zA-Z0-9]*$").unwrap());

/// JQuery construction with a single simple tag literal, e.g. `$('<br/>')`
/// or `$("<div/>", {...})`.
static TAG_CONSTRUCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\$\(\s*['"]<[a-zA-Z0-9]+\s*/?>['"]\s*[,)]"#).unwrap());

static HTML_UTILS_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:edx\.)?HtmlUtils\.[a-zA-Z0-9]+\(.*\)\.toString\(\)$").unwrap()
});

/// Quoted markup literal adjacent to a `+`: the string either starts with
/// `<` (ignoring spaces) or ends with `>` (ignoring spaces).
static CONCAT_WITH_HTML_RE: LazyLock<Regex> = LazyLock::new(|| {
    let single = r#"'(?:\s*<(?:[^']|\\')*|(?:[^']|\\')*>\s*)'"#;
    let double = r#""(?:\s*<(?:[^"]|\\")*|(?:[^"]|\\")*>\s*)""#;
    let string_with_html = format!("(?:{}|{})", single, double);
    Regex::new(&format!(
        r"(?:\+\s*{s}|{s}\s*\+)",
        s = string_with_html
    ))
    .unwrap()
});

/// Scan a browser script for unsafe DOM-insertion and concatenation shapes.
pub fn scan(text: &str) -> Vec<Violation> {
    let index = LineIndex::new(text);
    let mut violations = Vec::new();
    for (family, trigger) in CALL_FAMILIES.iter().zip(CALL_TRIGGERS.iter()) {
        check_call_family(text, &index, family, trigger, &mut violations);
    }
    check_concat_with_html(text, &index, &mut violations);
    // Commented-out lines are excluded from every family.
    violations.retain(|v| {
        !index
            .line_text(text, v.line)
            .trim_start()
            .starts_with(LINE_COMMENT_DELIM)
    });
    violations
}

fn check_call_family(
    text: &str,
    index: &LineIndex,
    family: &CallFamily,
    trigger: &Regex,
    violations: &mut Vec<Violation>,
) {
    for m in trigger.find_iter(text) {
        // The method name must be reached through some receiver character,
        // and must not be the tail of a longer identifier (e.g. "prepend"
        // for the "append" family).
        let Some((recv_idx, recv_ch)) = text[..m.start()].char_indices().next_back() else {
            continue;
        };
        if recv_ch.is_ascii_alphanumeric() || recv_ch == '_' || recv_ch == '$' {
            continue;
        }
        if text[..recv_idx].ends_with(family.safe_receiver) {
            continue;
        }
        let mut is_violation = true;
        if let Some(close) = find_balanced_end(text, m.end(), '(', ')') {
            match family.safety {
                SafetyCheck::Argument(is_safe) => {
                    is_violation = !is_safe(text[m.end()..close].trim());
                }
                SafetyCheck::Caller(is_safe) => {
                    let line = index.line_of(recv_idx);
                    let caller = &text[index.line_start(line)..recv_idx];
                    is_violation = !is_safe(caller);
                }
                SafetyCheck::Never => {}
            }
        }
        if is_violation {
            let line = index.line_of(recv_idx);
            violations.push(Violation::new(
                family.rule,
                line,
                Some(index.column_of(recv_idx)),
                index.line_text(text, line).trim(),
            ));
        }
    }
}

/// Argument allow-list for DOM-insertion calls such as `append()`:
/// a DOM-reference-shaped identifier, a plain literal without markup, a
/// single-tag `$()` construction, or a stringified HtmlUtils call.
fn is_jquery_argument_safe(argument: &str) -> bool {
    if SINGLE_IDENTIFIER_RE.is_match(argument) {
        return argument.ends_with("El") || argument.starts_with('$');
    }
    if argument.starts_with('"') || argument.starts_with('\'') {
        // JQuery treats a plain tag-free string as text and escapes it.
        return is_single_string_literal(argument) && !argument.contains('<');
    }
    if argument.starts_with("$(") {
        return TAG_CONSTRUCTION_RE.is_match(argument);
    }
    if HTML_UTILS_CALL_RE.is_match(argument) {
        return true;
    }
    if !argument.contains('+') {
        return argument.ends_with(".el") || argument.ends_with(".$el");
    }
    false
}

/// Argument allow-list for `html()`: getter form, an empty string, or a
/// stringified HtmlUtils call.
fn is_jquery_html_argument_safe(argument: &str) -> bool {
    argument.is_empty()
        || argument == "''"
        || argument == "\"\""
        || HTML_UTILS_CALL_RE.is_match(argument)
}

/// Receiver check for insert-into-target calls such as `appendTo()`: the
/// trailing identifier of the line prefix must look like a DOM reference.
fn is_jquery_insert_caller_safe(caller_line_start: &str) -> bool {
    let caller = trailing_identifier(caller_line_start);
    if caller.is_empty() {
        return false;
    }
    caller.ends_with("El")
        || caller.starts_with('$')
        || caller == "el"
        || caller == "parentNode"
}

fn trailing_identifier(prefix: &str) -> &str {
    let bytes = prefix.as_bytes();
    let mut start = bytes.len();
    while start > 0 {
        let b = bytes[start - 1];
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'$' {
            start -= 1;
        } else {
            break;
        }
    }
    &prefix[start..]
}

/// True when `argument` is exactly one quoted literal.
fn is_single_string_literal(argument: &str) -> bool {
    let mut chars = argument.char_indices();
    let Some((_, quote)) = chars.next() else {
        return false;
    };
    let mut escaped = false;
    for (i, ch) in chars {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return i + ch.len_utf8() == argument.len();
        }
    }
    false
}

/// Flag markup literals concatenated with `+`, merging consecutive matches
/// on the same line into one violation per run.
fn check_concat_with_html(text: &str, index: &LineIndex, violations: &mut Vec<Violation>) {
    let mut last_span: Option<(usize, usize)> = None;
    for m in CONCAT_WITH_HTML_RE.find_iter(text) {
        match last_span {
            Some((start, _)) if index.line_of(start) == index.line_of(m.start()) => {
                last_span = Some((start, m.end()));
            }
            Some(span) => {
                push_concat_violation(text, index, span, violations);
                last_span = Some((m.start(), m.end()));
            }
            None => {
                last_span = Some((m.start(), m.end()));
            }
        }
    }
    if let Some(span) = last_span {
        push_concat_violation(text, index, span, violations);
    }
}

fn push_concat_violation(
    text: &str,
    index: &LineIndex,
    span: (usize, usize),
    violations: &mut Vec<Violation>,
) {
    let line = index.line_of(span.0);
    violations.push(Violation::new(
        &rules::JAVASCRIPT_CONCAT_HTML,
        line,
        Some(index.column_of(span.0)),
        index.line_text(text, line).trim(),
    ));
}
