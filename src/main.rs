//! Xsslint CLI binary entry point.
//! Delegates to modules for scanning and prints results.

mod cli;
mod config;
mod lint;
mod linters;
mod models;
mod output;
mod pragma;
mod utils;

use clap::Parser;
use cli::{Cli, Commands};
// Colorization centralized in utils; no direct owo_colors usage here

fn main() {
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Rules => {
            for rule in models::rules::CATALOG {
                println!("{}  {}", rule.id, rule.message);
            }
        }
        Commands::Lint {
            path,
            repo_root,
            output,
            list_files,
            rule_totals,
            verbose,
        } => {
            let eff = config::resolve_effective(
                repo_root.as_deref(),
                output.as_deref(),
                if list_files { Some(true) } else { None },
                if rule_totals { Some(true) } else { None },
                if verbose { Some(true) } else { None },
            );
            if eff.output != "human" && eff.output != "json" {
                eprintln!(
                    "{} {}",
                    crate::utils::error_prefix(),
                    format!("Unknown output mode: {} (expected human or json)", eff.output)
                );
                std::process::exit(2);
            }
            // Friendly note if no xsslint config was found
            let cfg = config::load_config(&eff.repo_root);
            if cfg.is_none() && eff.output != "json" {
                eprintln!(
                    "{} {}",
                    crate::utils::note_prefix(),
                    "No xsslint.toml found; using defaults."
                );
            }
            // Emit single top info when the built-in skip list is in effect
            if eff.output != "json"
                && cfg.as_ref().map_or(true, |c| c.skip_dirs.is_none())
            {
                let joined = format!("[{}]", config::DEFAULT_SKIP_DIRS.join(", "));
                eprintln!(
                    "{} {}",
                    crate::utils::info_prefix(),
                    format!("Using default skip list: {}", joined)
                );
            }
            let target = match path {
                Some(p) => eff.repo_root.join(p),
                None => eff.repo_root.clone(),
            };
            if !target.exists() {
                eprintln!(
                    "{} {}",
                    crate::utils::error_prefix(),
                    format!("Path not found: {}", target.to_string_lossy())
                );
                std::process::exit(2);
            }
            let (files, summary) = lint::run_lint(&eff.repo_root, &target, &eff.skip_dirs);
            let opts = output::ReportOptions {
                list_files: eff.list_files,
                rule_totals: eff.rule_totals,
                verbose: eff.verbose,
            };
            output::print_lint(&files, &summary, &eff.output, &opts);
            if summary.violations > 0 {
                std::process::exit(1);
            }
        }
    }
}
