//! Shared data models for scan results and run-wide aggregation.

pub mod rules;

use rules::Rule;
use std::collections::BTreeMap;

/// A single rule match at a source location.
///
/// `start_line` equals `line` unless the match spans a multi-line literal,
/// in which case it is the literal's opening line.
#[derive(Debug)]
pub struct Violation {
    pub rule: &'static Rule,
    pub line: usize,
    pub start_line: usize,
    pub column: Option<usize>,
    pub disabled: bool,
    pub raw_context: String,
}

impl Violation {
    /// A violation whose match sits entirely on one line.
    pub fn new(rule: &'static Rule, line: usize, column: Option<usize>, raw_context: &str) -> Self {
        Self::spanning(rule, line, line, column, raw_context)
    }

    /// A violation whose match opened on an earlier line.
    pub fn spanning(
        rule: &'static Rule,
        line: usize,
        start_line: usize,
        column: Option<usize>,
        raw_context: &str,
    ) -> Self {
        debug_assert!(start_line <= line);
        Violation {
            rule,
            line,
            start_line,
            column,
            disabled: false,
            raw_context: raw_context.to_string(),
        }
    }

    /// Deterministic ordering key: `(line, rule id, column-or-0)`.
    pub fn sort_key(&self) -> (usize, &'static str, usize) {
        (self.line, self.rule.id, self.column.unwrap_or(0))
    }
}

/// Ordered violations for one scanned file.
#[derive(Debug)]
pub struct FileResults {
    pub path: String,
    pub violations: Vec<Violation>,
}

impl FileResults {
    pub fn new(path: &str, violations: Vec<Violation>) -> Self {
        FileResults {
            path: path.to_string(),
            violations,
        }
    }

    /// Re-sort violations into `(line, rule, column)` order.
    pub fn sort(&mut self) {
        self.violations.sort_by_key(|v| v.sort_key());
    }

    pub fn enabled_count(&self) -> usize {
        self.violations.iter().filter(|v| !v.disabled).count()
    }
}

/// Run-wide aggregation folded from per-file results.
#[derive(Debug, Default)]
pub struct SummaryResults {
    /// Enabled violations across the run.
    pub violations: usize,
    /// Enabled violations per rule id, ordered.
    pub by_rule: BTreeMap<String, usize>,
    pub files_scanned: usize,
    pub files_with_violations: usize,
}

impl SummaryResults {
    /// Fold one file's results into the summary.
    pub fn add_file(&mut self, results: &FileResults) {
        self.files_scanned += 1;
        let enabled = results.enabled_count();
        if enabled > 0 {
            self.files_with_violations += 1;
        }
        self.violations += enabled;
        for v in results.violations.iter().filter(|v| !v.disabled) {
            *self.by_rule.entry(v.rule.id.to_string()).or_insert(0) += 1;
        }
    }
}
