//! CLI argument parsing.
//!
//! Everything after the first command token is handed to the command
//! manager untouched, hyphenated tokens included, so the manager's own flag
//! rules apply to it.

use clap::Parser;

// ============================================================================
// CLI argument types
// ============================================================================

/// Top-level CLI arguments for the `tenon` binary.
#[derive(Parser, Debug)]
#[command(name = "tenon", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-essential output.
    #[arg(short, long)]
    pub quiet: bool,

    /// List the registered commands and exit.
    #[arg(long)]
    pub list: bool,

    /// Command name followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tokens: Vec<String>,
}

// ============================================================================
// Tests
// ============================================================================
