//! CLI argument definitions using clap
//!
//! clap only handles the binary's global options; everything from the first
//! command token on is handed to the dispatcher untouched.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Command-dispatch engine demo: resolves nested subcommands, binds arguments and flags
#[derive(Parser, Debug)]
#[command(name = "cmdtree")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Debug verbosity, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub debug: u8,

    /// Directory holding a local .cmdtree.toml
    #[arg(short = 'C', long, env = "CMDTREE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Only run commands eligible for the pre-run pass
    #[arg(long)]
    pub pre_run: bool,

    /// Command path, arguments and flags
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub tokens: Vec<String>,
}
