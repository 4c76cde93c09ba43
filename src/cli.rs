//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "xsslint",
    version,
    about = "xsslint (Rust)",
    long_about = "xsslint — a fast static scanner for XSS-prone patterns in templates, browser scripts, and server scripts.\n\nConfiguration precedence: CLI > xsslint.toml > defaults.",
    after_help = "Examples:\n  xsslint lint\n  xsslint lint lms/templates --rule-totals\n  xsslint lint --output json\n  xsslint rules",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands for scanning and catalog inspection.
pub enum Commands {
    /// Show version
    #[command(
        about = "Show version",
        long_about = "Print the current xsslint version."
    )]
    Version,
    /// Scan files for XSS-prone patterns
    #[command(
        about = "Run the scan",
        long_about = "Scan templates, browser scripts, and server scripts under PATH (default: repository root). Enabled violations contribute to CI exits.",
        after_help = "Examples:\n  xsslint lint\n  xsslint lint cms/djangoapps --list-files\n  xsslint lint --verbose --output json"
    )]
    Lint {
        #[arg(help = "File or directory to scan (default: repository root)")]
        path: Option<String>,
        #[arg(long, help = "Repository root (default: current dir)")]
        repo_root: Option<String>,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Print only files that have enabled violations")]
        list_files: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Append per-rule violation totals")]
        rule_totals: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Include disabled violations in the report")]
        verbose: bool,
    },
    /// List the rule catalog
    #[command(
        about = "List rules",
        long_about = "Print every rule id with its message."
    )]
    Rules,
}
