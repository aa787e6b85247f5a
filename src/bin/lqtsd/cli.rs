use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "lqtsd", author, version = lqts::core::version(), about = "LQTS scheduling daemon")]
pub struct Lqtsd {
    /// The configuration file to use
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,
}

#[derive(Debug, Parser)]
pub enum Commands {
    /// Print shell completion script to stdout
    Completions(CompletionsArgs),
}

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Elvish,
    Fish,
    Powershell,
    Zsh,
}
