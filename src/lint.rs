//! Scan driver: file discovery, classification, and parallel scanning.
//!
//! Produces per-file results plus a run-wide summary. Files are discovered
//! with a recursive glob under the target path, filtered through the skip
//! list, and scanned in parallel. Report ordering is lexicographic on the
//! repo-root-relative path.

use crate::linters;
use crate::models::{FileResults, SummaryResults};
use crate::utils::{compile_skip_dirs, is_skip_dir};
use glob::glob;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Scan `target` (a file or directory) and fold the results.
///
/// `target` may point anywhere under `repo_root`; reported paths are
/// relative to `repo_root`. Unreadable and unclassified files are skipped.
pub fn run_lint(
    repo_root: &Path,
    target: &Path,
    skip_dirs: &[String],
) -> (Vec<FileResults>, SummaryResults) {
    let skip_patterns = compile_skip_dirs(skip_dirs);

    let mut targets: Vec<PathBuf> = Vec::new();
    if target.is_file() {
        targets.push(target.to_path_buf());
    } else {
        let pattern = format!("{}/**/*", target.to_string_lossy());
        for entry in glob(&pattern).expect("bad glob pattern") {
            if let Ok(p) = entry {
                if p.is_file() {
                    targets.push(p);
                }
            }
        }
    }

    let mut files: Vec<FileResults> = targets
        .par_iter()
        .filter_map(|path| {
            let kind = linters::classify(path)?;
            let rel = pathdiff::diff_paths(path, repo_root).unwrap_or_else(|| path.clone());
            let directory = rel
                .parent()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            if is_skip_dir(&skip_patterns, &directory) {
                return None;
            }
            let text = fs::read_to_string(path).ok()?;
            let mut results = FileResults::new(&rel.to_string_lossy(), linters::scan(kind, &text));
            results.sort();
            Some(results)
        })
        .collect();

    files.sort_by(|a, b| a.path.cmp(&b.path));

    let mut summary = SummaryResults::default();
    for file in &files {
        summary.add_file(file);
    }
    (files, summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn test_directory_scan_classifies_and_sorts() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "js/app.js", "el.append(userHtml);\n");
        write(root, "lms/templates/page.html", "${ banner | n }\n");
        write(root, "lms/djangoapps/views.py", "out = '<b>' + name\n");
        write(root, "README.md", "# readme\n");

        let (files, summary) = run_lint(root, root, &[]);
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["js/app.js", "lms/djangoapps/views.py", "lms/templates/page.html"]
        );
        assert_eq!(summary.files_scanned, 3);
        assert_eq!(summary.files_with_violations, 3);
        assert_eq!(summary.violations, 3);
        assert_eq!(summary.by_rule.get("javascript-jquery-append"), Some(&1));
        assert_eq!(summary.by_rule.get("python-concat-html"), Some(&1));
        assert_eq!(summary.by_rule.get("mako-unescaped-expression"), Some(&1));
    }

    #[test]
    fn test_skip_dirs_and_excluded_names() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "node_modules/lib/index.js", "el.append(userHtml);\n");
        write(root, "js/vendor.min.js", "el.append(userHtml);\n");
        write(root, "app/tests.py", "out = '<b>' + name\n");
        write(root, "app/views.py", "out = '<b>' + name\n");

        let skip: Vec<String> = vec!["node_modules".to_string()];
        let (files, summary) = run_lint(root, root, &skip);
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["app/views.py"]);
        assert_eq!(summary.files_scanned, 1);
    }

    #[test]
    fn test_single_file_target() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "cards/item.underscore", "<%= title %>\n");

        let (files, summary) = run_lint(root, &root.join("cards/item.underscore"), &[]);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "cards/item.underscore");
        assert_eq!(summary.violations, 1);
        assert_eq!(summary.by_rule.get("underscore-not-escaped"), Some(&1));
    }
}
