mod config;
mod logger;
mod relocate;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::Shell;

use crate::relocate::Relocate;

#[derive(Parser)]
#[command(author, version, name = env!("CARGO_BIN_NAME"), about = "Sort movies and series into a media library")]
pub struct RelocateArgs {
    /// Source directories to scan for video files
    #[arg(value_hint = clap::ValueHint::DirPath)]
    sources: Vec<PathBuf>,

    /// Destination library root
    #[arg(short, long, name = "DIR", value_hint = clap::ValueHint::DirPath)]
    dest: Option<PathBuf>,

    /// Auto-confirm all prompts without asking
    #[arg(short, long)]
    auto: bool,

    /// Only print the plan without moving files
    #[arg(short, long)]
    print: bool,

    /// Title alias file (JSON or TOML)
    #[arg(short = 'A', long, name = "FILE", value_hint = clap::ValueHint::FilePath)]
    aliases: Option<PathBuf>,

    /// Extra directory name that never gives title context
    #[arg(short = 'x', long, num_args = 1, action = clap::ArgAction::Append, name = "NAME")]
    protect: Vec<String>,

    /// Disable the release name oracle
    #[arg(short = 'N', long)]
    no_oracle: bool,

    /// Keep emptied source directories
    #[arg(short, long)]
    keep_dirs: bool,

    /// Print debug information
    #[arg(short = 'D', long)]
    debug: bool,

    /// Generate shell completion
    #[arg(short = 'l', long, name = "SHELL")]
    completion: Option<Shell>,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = RelocateArgs::parse();
    if let Some(ref shell) = args.completion {
        media_relocate::generate_shell_completion(*shell, RelocateArgs::command(), true, env!("CARGO_BIN_NAME"))
    } else {
        Relocate::new(args)?.run()
    }
}
