//! Mako-style template scanner.
//!
//! Expressions are `${ expr | filters }`. The default form auto-escapes and
//! is never flagged; only a filter chain containing the raw `n` filter is
//! scanned, and flagged unless the expression escapes itself.

use crate::linters::find_balanced_end;
use crate::models::rules;
use crate::models::Violation;
use crate::utils::LineIndex;
use regex::Regex;
use std::sync::LazyLock;

const START_DELIM: &str = "${";
const LINE_COMMENT: &str = "##";

/// Matches the trailing filter chain, e.g. "| n, decode.utf8" in
/// "x | n, decode.utf8".
static FILTERS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|([.,\w\s]*)$").unwrap());

/// Scan a Mako-style template for raw-filtered expressions.
pub fn scan(text: &str) -> Vec<Violation> {
    let index = LineIndex::new(text);
    let mut violations = Vec::new();
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(START_DELIM) {
        let start = search_from + rel;
        let inner_start = start + START_DELIM.len();
        let line = index.line_of(start);
        if index.line_text(text, line).trim_start().starts_with(LINE_COMMENT) {
            search_from = inner_start;
            continue;
        }
        let Some(close) = find_balanced_end(text, inner_start, '{', '}') else {
            // Unclosed expression: no match, keep searching past the opener.
            search_from = inner_start;
            continue;
        };
        search_from = close + 1;

        let inner = &text[inner_start..close];
        let Some(filters_match) = FILTERS_RE.captures(inner) else {
            continue;
        };
        let filters: Vec<&str> = filters_match
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .collect();
        if !filters.contains(&"n") {
            continue;
        }
        let expression = inner[..filters_match.get(0).unwrap().start()].trim();
        if is_safe_raw_expression(expression) {
            continue;
        }
        violations.push(Violation::new(
            &rules::MAKO_UNESCAPED_EXPRESSION,
            line,
            Some(index.column_of(start)),
            index.line_text(text, line).trim(),
        ));
    }
    violations
}

/// Escaping inside the expression makes the raw filter acceptable,
/// e.g. `${HTML(banner) | n}` or `${escape(name) | n}`.
fn is_safe_raw_expression(expression: &str) -> bool {
    expression.starts_with("HTML(") || expression.starts_with("escape(")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_escaping_form_is_never_flagged() {
        assert!(scan("${ message }").is_empty());
        assert!(scan("<p>${ user.name }</p>").is_empty());
    }

    #[test]
    fn test_raw_filter_without_wrapping_is_flagged() {
        let violations = scan("<p>${ banner | n }</p>");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule.id, "mako-unescaped-expression");
        assert_eq!(violations[0].line, 1);
    }

    #[test]
    fn test_raw_filter_chain_is_flagged() {
        assert_eq!(scan("${ banner | n, decode.utf8 }").len(), 1);
        assert!(scan("${ banner | h }").is_empty());
    }

    #[test]
    fn test_wrapped_raw_expressions_are_safe() {
        assert!(scan("${ HTML(banner) | n }").is_empty());
        assert!(scan("${ escape(name) | n }").is_empty());
        assert_eq!(scan("${ wrap(HTML(banner)) | n }").len(), 1);
    }

    #[test]
    fn test_commented_line_is_skipped() {
        assert!(scan("## ${ banner | n }").is_empty());
    }

    #[test]
    fn test_brace_matching_is_quote_aware() {
        // The '}' inside the quoted string must not close the expression.
        let violations = scan("${ render('}') | n }");
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn test_unclosed_expression_degrades_to_no_match() {
        assert!(scan("${ banner | n").is_empty());
        // A later well-formed expression is still found.
        let text = "${ oops\n${ banner | n }\n";
        let violations = scan(text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 2);
    }
}
