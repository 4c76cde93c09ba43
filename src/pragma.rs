//! Line-scoped suppression via `xss-lint: disable=<rule>[,<rule>...]`.
//!
//! The marker is honored only when at most 5 whitespace-delimited tokens
//! precede it on its line, so an annotation buried deep inside prose or
//! code is never treated as a pragma. Each pragma entry suppresses exactly
//! one later violation of the named rule; a later pragma for the same rule
//! overwrites an unconsumed earlier one.

use crate::models::Violation;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xss-lint:\s*disable=([a-zA-Z\- ,]+)").unwrap());

const MAX_PREFIX_TOKENS: usize = 5;

/// Mutate `disabled` flags on `violations` according to pragmas in `text`.
///
/// Violations are visited in ascending line order (ties keep detection
/// order). A pragma on the same line as a violation suppresses it even when
/// the marker textually follows the match.
pub fn apply_disable_pragmas(text: &str, violations: &mut [Violation]) {
    let events = collect_events(text);

    let mut order: Vec<usize> = (0..violations.len()).collect();
    order.sort_by_key(|&i| violations[i].line);

    let mut pending: HashMap<String, usize> = HashMap::new();
    let mut next = 0;
    for &i in &order {
        let vline = violations[i].line;
        while next < events.len() && events[next].0 <= vline {
            pending.insert(events[next].1.clone(), events[next].0);
            next += 1;
        }
        if pending.remove(violations[i].rule.id).is_some() {
            violations[i].disabled = true;
        }
    }
}

/// Collect `(line, rule-id)` pragma events in ascending line order.
fn collect_events(text: &str) -> Vec<(usize, String)> {
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let Some(caps) = MARKER_RE.captures(line) else {
            continue;
        };
        let marker_start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        if line[..marker_start].split_whitespace().count() > MAX_PREFIX_TOKENS {
            continue;
        }
        if let Some(list) = caps.get(1) {
            for rule_id in list.as_str().split(',') {
                let rule_id = rule_id.trim();
                if !rule_id.is_empty() {
                    events.push((lineno, rule_id.to_string()));
                }
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::rules;

    fn violation(rule: &'static rules::Rule, line: usize) -> Violation {
        Violation::new(rule, line, Some(1), "ctx")
    }

    #[test]
    fn test_pragma_consumes_exactly_one_violation() {
        let text = "\
# xss-lint: disable=underscore-not-escaped
<%= msg %>
<%= msg %>
";
        let mut violations = vec![
            violation(&rules::UNDERSCORE_NOT_ESCAPED, 2),
            violation(&rules::UNDERSCORE_NOT_ESCAPED, 3),
        ];
        apply_disable_pragmas(text, &mut violations);
        assert!(violations[0].disabled);
        assert!(!violations[1].disabled);
    }

    #[test]
    fn test_marker_token_position_limit() {
        // 5 tokens before the marker: honored.
        let honored = "a b c d e # xss-lint: disable=python-wrap-html\nx\n";
        let mut violations = vec![violation(&rules::PYTHON_WRAP_HTML, 2)];
        apply_disable_pragmas(honored, &mut violations);
        assert!(violations[0].disabled);

        // 6 tokens before the marker: ignored.
        let ignored = "a b c d e f # xss-lint: disable=python-wrap-html\nx\n";
        let mut violations = vec![violation(&rules::PYTHON_WRAP_HTML, 2)];
        apply_disable_pragmas(ignored, &mut violations);
        assert!(!violations[0].disabled);
    }

    #[test]
    fn test_trailing_pragma_on_same_line_applies() {
        let text = "<%= msg %>  <%! // xss-lint: disable=underscore-not-escaped %>\n";
        let mut violations = vec![violation(&rules::UNDERSCORE_NOT_ESCAPED, 1)];
        apply_disable_pragmas(text, &mut violations);
        assert!(violations[0].disabled);
    }

    #[test]
    fn test_pragma_does_not_reach_backwards() {
        let text = "x\nx\n# xss-lint: disable=python-wrap-html\n";
        let mut violations = vec![violation(&rules::PYTHON_WRAP_HTML, 1)];
        apply_disable_pragmas(text, &mut violations);
        assert!(!violations[0].disabled);
    }

    #[test]
    fn test_multiple_rules_in_one_pragma() {
        let text = "# xss-lint: disable=python-wrap-html,python-concat-html\nx\n";
        let mut violations = vec![
            violation(&rules::PYTHON_CONCAT_HTML, 2),
            violation(&rules::PYTHON_WRAP_HTML, 2),
        ];
        apply_disable_pragmas(text, &mut violations);
        assert!(violations[0].disabled);
        assert!(violations[1].disabled);
    }

    #[test]
    fn test_unknown_rule_is_ignored() {
        let text = "# xss-lint: disable=not-a-rule\nx\n";
        let mut violations = vec![violation(&rules::PYTHON_WRAP_HTML, 2)];
        apply_disable_pragmas(text, &mut violations);
        assert!(!violations[0].disabled);
    }

    #[test]
    fn test_later_pragma_overwrites_unconsumed_entry() {
        // Two pragmas with no violation in between collapse to one credit.
        let text = "\
# xss-lint: disable=python-wrap-html
# xss-lint: disable=python-wrap-html
x
x
";
        let mut violations = vec![
            violation(&rules::PYTHON_WRAP_HTML, 3),
            violation(&rules::PYTHON_WRAP_HTML, 4),
        ];
        apply_disable_pragmas(text, &mut violations);
        assert!(violations[0].disabled);
        assert!(!violations[1].disabled);
    }
}
