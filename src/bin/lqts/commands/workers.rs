use crate::cli::WorkersArgs;
use lqts::client::Client;

pub async fn handle(client: &Client, args: WorkersArgs) -> anyhow::Result<()> {
    let response = match args.set {
        Some(n) => client.set_workers(n).await?,
        None => client.get_workers().await?,
    };
    println!("Workers: {}", response.nworkers);
    Ok(())
}
