//! Supporting helpers: colorized stderr prefixes, skip-directory matching,
//! and byte-offset to line/column mapping.

use owo_colors::OwoColorize;
use regex::Regex;

fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

/// Prefix for fatal configuration/usage messages.
pub fn error_prefix() -> String {
    if use_colors() {
        "✖ error:".red().bold().to_string()
    } else {
        "✖ error:".to_string()
    }
}

/// Prefix for friendly notes.
pub fn note_prefix() -> String {
    if use_colors() {
        "note:".bright_black().to_string()
    } else {
        "note:".to_string()
    }
}

/// Prefix for informational messages.
pub fn info_prefix() -> String {
    if use_colors() {
        "◆ info:".blue().bold().to_string()
    } else {
        "◆ info:".to_string()
    }
}

/// Compile skip-dir patterns: a configured dir matches itself and anything
/// nested under it, at any depth.
pub fn compile_skip_dirs(skip_dirs: &[String]) -> Vec<Regex> {
    skip_dirs
        .iter()
        .filter_map(|dir| {
            let escaped = dir
                .split('/')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("/");
            Regex::new(&format!("^(.*/)*{}(/.*)*$", escaped)).ok()
        })
        .collect()
}

/// True when the `/`-separated relative directory falls under a skip dir.
pub fn is_skip_dir(skip_patterns: &[Regex], directory: &str) -> bool {
    skip_patterns.iter().any(|re| re.is_match(directory))
}

/// Byte-offset to 1-based line/column mapping over an immutable text buffer.
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                starts.push(i + 1);
            }
        }
        LineIndex { starts }
    }

    /// 1-based line number containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.starts.partition_point(|&s| s <= offset)
    }

    /// 1-based byte column of `offset` within its line.
    pub fn column_of(&self, offset: usize) -> usize {
        let line = self.line_of(offset);
        offset - self.starts[line - 1] + 1
    }

    /// Byte offset at which 1-based line `line` starts.
    pub fn line_start(&self, line: usize) -> usize {
        self.starts[line - 1]
    }

    /// The trimmed text of 1-based line `line` in `text`.
    pub fn line_text<'a>(&self, text: &'a str, line: usize) -> &'a str {
        let start = self.starts[line - 1];
        let end = self
            .starts
            .get(line)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(text.len());
        text[start..end].trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_dir_matches_nested_paths() {
        let patterns = compile_skip_dirs(&[
            "node_modules".to_string(),
            "reports/diff_quality".to_string(),
        ]);
        assert!(is_skip_dir(&patterns, "node_modules"));
        assert!(is_skip_dir(&patterns, "a/b/node_modules/c"));
        assert!(is_skip_dir(&patterns, "reports/diff_quality"));
        assert!(is_skip_dir(&patterns, "x/reports/diff_quality/y"));
        assert!(!is_skip_dir(&patterns, "reports"));
        assert!(!is_skip_dir(&patterns, "node_modules_extra"));
        assert!(!is_skip_dir(&patterns, "src/lib"));
    }

    #[test]
    fn test_line_index_lines_and_columns() {
        let text = "ab\ncd\n\nxyz";
        let idx = LineIndex::new(text);
        assert_eq!(idx.line_of(0), 1);
        assert_eq!(idx.line_of(3), 2);
        assert_eq!(idx.line_of(4), 2);
        assert_eq!(idx.line_of(6), 3);
        assert_eq!(idx.line_of(7), 4);
        assert_eq!(idx.column_of(4), 2);
        assert_eq!(idx.line_text(text, 2), "cd");
        assert_eq!(idx.line_text(text, 4), "xyz");
    }
}
