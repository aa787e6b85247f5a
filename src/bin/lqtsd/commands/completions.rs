use crate::cli::{self, Lqtsd};
use clap::CommandFactory;
use clap_complete::{generate, shells::*};
use std::io;

pub(crate) fn handle_completions(args: cli::CompletionsArgs) {
    let mut cmd = Lqtsd::command();
    match args.shell {
        cli::Shell::Bash => generate(Bash, &mut cmd, "lqtsd", &mut io::stdout()),
        cli::Shell::Elvish => generate(Elvish, &mut cmd, "lqtsd", &mut io::stdout()),
        cli::Shell::Fish => generate(Fish, &mut cmd, "lqtsd", &mut io::stdout()),
        cli::Shell::Powershell => generate(PowerShell, &mut cmd, "lqtsd", &mut io::stdout()),
        cli::Shell::Zsh => generate(Zsh, &mut cmd, "lqtsd", &mut io::stdout()),
    }
}
