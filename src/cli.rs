//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Chat bot that replies to YouTube links with the audio file.
#[derive(Parser, Debug)]
#[command(name = "audio-relay")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = "config.json")]
    pub conf: PathBuf,

    /// Increase output verbosity (-v for debug, -vv for trace); overrides `log_level`
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
