mod completions;
mod qdel;
mod qpriority;
mod qstat;
mod qsub;
mod workers;

use crate::cli::Commands;
use lqts::client::Client;

pub async fn handle_commands(client: Client, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Qsub(args) => qsub::handle(&client, args).await,
        Commands::Qstat(args) => qstat::handle(&client, args).await,
        Commands::Qsummary => qstat::handle_summary(&client).await,
        Commands::Workers(args) => workers::handle(&client, args).await,
        Commands::Jobgroup(args) => qstat::handle_jobgroup(&client, args).await,
        Commands::Qdel(args) => qdel::handle(&client, args).await,
        Commands::Qpriority(args) => qpriority::handle(&client, args).await,
        Commands::Qclear(args) => {
            if !args.really {
                anyhow::bail!("refusing to clear the entire queue without --really");
            }
            client.qclear(true).await
        }
        Commands::ClearCompleted(args) => {
            if !args.really {
                anyhow::bail!("refusing to clear completed jobs without --really");
            }
            client.clear_completed(true, args.group).await
        }
        Commands::Resume => client.resume().await,
        Commands::Completions(args) => {
            completions::handle_completions(args);
            Ok(())
        }
    }
}
