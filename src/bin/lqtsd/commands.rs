mod completions;

use crate::cli::Commands;

pub fn handle_commands(command: Commands) {
    match command {
        Commands::Completions(args) => completions::handle_completions(args),
    }
}
