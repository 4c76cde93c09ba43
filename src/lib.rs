//! Xsslint core library.
//!
//! This crate exposes programmatic APIs for scanning templates, browser
//! scripts, and server scripts for XSS-prone patterns.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `lint`: File discovery, classification, and parallel scanning.
//! - `linters`: Per-dialect scanners and rule checks.
//! - `models`: Data models for rules, violations, and summaries.
//! - `output`: Human/JSON printers for the scan report.
//! - `pragma`: In-source disable pragmas.
//! - `utils`: Supporting helpers.
//!
//! Note: All documentation comments are written in English by convention.
pub mod cli;
pub mod config;
pub mod lint;
pub mod linters;
pub mod models;
pub mod output;
pub mod pragma;
pub mod utils;
