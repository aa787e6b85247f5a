use crate::cli::{self, LqtsCli};
use clap::CommandFactory;
use clap_complete::{generate, shells::*};
use std::io;

pub(crate) fn handle_completions(args: cli::CompletionsArgs) {
    let mut cmd = LqtsCli::command();
    match args.shell {
        cli::Shell::Bash => generate(Bash, &mut cmd, "lqts", &mut io::stdout()),
        cli::Shell::Elvish => generate(Elvish, &mut cmd, "lqts", &mut io::stdout()),
        cli::Shell::Fish => generate(Fish, &mut cmd, "lqts", &mut io::stdout()),
        cli::Shell::Powershell => generate(PowerShell, &mut cmd, "lqts", &mut io::stdout()),
        cli::Shell::Zsh => generate(Zsh, &mut cmd, "lqts", &mut io::stdout()),
    }
}
