//! Output rendering for the scan report.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-file violation arrays and a top-level summary.

use crate::models::{FileResults, SummaryResults};
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

/// Report shaping flags resolved from CLI and config.
pub struct ReportOptions {
    pub list_files: bool,
    pub rule_totals: bool,
    pub verbose: bool,
}

/// Print scan results in the requested format.
pub fn print_lint(
    files: &[FileResults],
    summary: &SummaryResults,
    output: &str,
    opts: &ReportOptions,
) {
    match output {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&compose_lint_json(files, summary)).unwrap()
        ),
        _ => {
            let color = use_colors(output);
            if opts.list_files {
                for f in files {
                    if f.enabled_count() > 0 {
                        println!("{}", f.path);
                    }
                }
            } else {
                for f in files {
                    for v in &f.violations {
                        if v.disabled && !opts.verbose {
                            continue;
                        }
                        let icon = if color {
                            "✖".red().to_string()
                        } else {
                            "✖".to_string()
                        };
                        let tag = if color {
                            "⟦xss⟧".red().bold().to_string()
                        } else {
                            "⟦xss⟧".to_string()
                        };
                        let loc = format!("{}:{}", f.path, v.line);
                        let loc = if color { loc.bold().to_string() } else { loc };
                        let mut line = format!(
                            "{} {} {} ❲{}❳ — {}",
                            icon, tag, loc, v.rule.id, v.rule.message
                        );
                        if v.disabled {
                            let suffix = if color {
                                "(disabled)".bright_black().to_string()
                            } else {
                                "(disabled)".to_string()
                            };
                            line = format!("{} {}", line, suffix);
                        }
                        println!("{}", line);
                    }
                }
            }
            if opts.rule_totals {
                for (rule, count) in &summary.by_rule {
                    println!("{}: {}", rule, count);
                }
            }
            let line = format!(
                "— Summary — violations={} files={} listed={}",
                summary.violations, summary.files_scanned, summary.files_with_violations
            );
            if color {
                println!("{}", line.bold());
            } else {
                println!("{}", line);
            }
        }
    }
}

/// Compose the scan JSON object (pure) for testing/snapshot purposes.
pub fn compose_lint_json(files: &[FileResults], summary: &SummaryResults) -> JsonVal {
    let items: Vec<_> = files
        .iter()
        .map(|f| {
            let violations: Vec<_> = f
                .violations
                .iter()
                .map(|v| {
                    json!({
                        "rule": v.rule.id,
                        "line": v.line,
                        "start_line": v.start_line,
                        "column": v.column,
                        "disabled": v.disabled,
                        "message": v.rule.message,
                        "context": v.raw_context,
                    })
                })
                .collect();
            json!({"path": f.path, "violations": violations})
        })
        .collect();
    let rules: JsonVal = summary
        .by_rule
        .iter()
        .map(|(k, v)| (k.clone(), json!(v)))
        .collect::<serde_json::Map<String, JsonVal>>()
        .into();
    let summary = json!({
        "violations": summary.violations,
        "files": summary.files_scanned,
        "files_with_violations": summary.files_with_violations,
        "rules": rules,
    });
    json!({"files": items, "summary": summary})
}
