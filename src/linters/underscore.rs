//! Underscore-style template scanner.
//!
//! `<%= ... %>` is the unescaped interpolation form and is flagged unless
//! the expression escapes itself. `<%- ... %>` and `<% ... %>` are never
//! flagged.

use crate::models::rules;
use crate::models::Violation;
use crate::utils::LineIndex;
use regex::Regex;
use std::sync::LazyLock;

static UNESCAPED_EXPRESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<%=(.*?)%>").unwrap());

/// Scan an Underscore-style template for unescaped interpolations.
pub fn scan(text: &str) -> Vec<Violation> {
    let index = LineIndex::new(text);
    let mut violations = Vec::new();
    for caps in UNESCAPED_EXPRESSION_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or("").trim();
        if is_safe_unescaped_expression(inner) {
            continue;
        }
        let line = index.line_of(whole.start());
        let column = index.column_of(whole.start());
        violations.push(Violation::new(
            &rules::UNDERSCORE_NOT_ESCAPED,
            line,
            Some(column),
            index.line_text(text, line).trim(),
        ));
    }
    violations
}

/// Escaping inside the expression makes the unescaped form acceptable,
/// e.g. `<%= HtmlUtils.ensureHtml(message) %>` or `<%= _.escape(message) %>`.
fn is_safe_unescaped_expression(inner: &str) -> bool {
    inner.starts_with("HtmlUtils.") || inner.starts_with("_.escape(")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_forms_are_not_flagged() {
        assert!(scan("<%- message %>").is_empty());
        assert!(scan("<% if (x) { %>ok<% } %>").is_empty());
        assert!(scan("plain text with no tags").is_empty());
    }

    #[test]
    fn test_unescaped_expression_is_flagged_once_per_occurrence() {
        let text = "<h1><%= title %></h1>\n<p><%= body %></p>\n";
        let violations = scan(text);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].rule.id, "underscore-not-escaped");
        assert_eq!(violations[0].line, 1);
        assert_eq!(violations[1].line, 2);
    }

    #[test]
    fn test_self_escaping_expressions_are_safe() {
        assert!(scan("<%= HtmlUtils.ensureHtml(message) %>").is_empty());
        assert!(scan("<%= _.escape(message) %>").is_empty());
        // A call that merely contains an escape deeper in is still flagged.
        assert_eq!(scan("<%= wrap(_.escape(message)) %>").len(), 1);
    }

    #[test]
    fn test_multi_line_expression_reports_opening_line() {
        let text = "line one\n<%=\n  message\n%>\n";
        let violations = scan(text);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].line, 2);
        assert_eq!(violations[0].start_line, 2);
    }

    #[test]
    fn test_pragma_disables_first_of_two() {
        let text = "\
<%! // xss-lint: disable=underscore-not-escaped %>
<%= msg %>
<%= msg %>
";
        let violations = crate::linters::scan(crate::linters::ArtifactKind::UnderscoreTemplate, text);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].disabled);
        assert!(!violations[1].disabled);
    }
}
