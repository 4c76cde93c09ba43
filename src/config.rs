//! Configuration discovery and effective settings resolution.
//!
//! The scanner reads `xsslint.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags.
//! Defaults:
//! - `output`: `human`
//! - `skip_dirs`: the built-in skip list
//! - `lint.list_files|rule_totals|verbose`: false
//!
//! Overrides precedence: CLI > config file > defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Directories never scanned unless the config replaces the list.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "spec",
    "test_root",
    "perf_tests",
    "reports/diff_quality",
    "common/static/bundles",
];

#[derive(Debug, Default, Deserialize, Clone)]
/// Lint-related configuration section under `[lint]`.
pub struct LintCfg {
    pub list_files: Option<bool>,
    pub rule_totals: Option<bool>,
    pub verbose: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `xsslint.toml|yaml`.
pub struct XssLintConfig {
    pub output: Option<String>,
    /// Replaces the default skip list when present.
    pub skip_dirs: Option<Vec<String>>,
    pub lint: Option<LintCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub output: String,
    pub skip_dirs: Vec<String>,
    pub list_files: bool,
    pub rule_totals: bool,
    pub verbose: bool,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when an `xsslint.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if cur.join("xsslint.toml").exists()
            || cur.join("xsslint.yaml").exists()
            || cur.join("xsslint.yml").exists()
        {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `XssLintConfig` from `xsslint.toml` or `xsslint.yaml|yml` if present.
pub fn load_config(root: &Path) -> Option<XssLintConfig> {
    let toml_path = root.join("xsslint.toml");
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        let cfg: XssLintConfig = toml::from_str(&s).ok()?;
        return Some(cfg);
    }
    for yml in ["xsslint.yaml", "xsslint.yml"] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            let cfg: XssLintConfig = serde_yaml::from_str(&s).ok()?;
            return Some(cfg);
        }
    }
    None
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_list_files: Option<bool>,
    cli_rule_totals: Option<bool>,
    cli_verbose: Option<bool>,
) -> Effective {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root).unwrap_or_default();

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let skip_dirs = cfg
        .skip_dirs
        .unwrap_or_else(|| DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect());

    let list_files = cli_list_files
        .or_else(|| cfg.lint.as_ref().and_then(|l| l.list_files))
        .unwrap_or(false);
    let rule_totals = cli_rule_totals
        .or_else(|| cfg.lint.as_ref().and_then(|l| l.rule_totals))
        .unwrap_or(false);
    let verbose = cli_verbose
        .or_else(|| cfg.lint.as_ref().and_then(|l| l.verbose))
        .unwrap_or(false);

    Effective {
        repo_root,
        output,
        skip_dirs,
        list_files,
        rule_totals,
        verbose,
    }
}
