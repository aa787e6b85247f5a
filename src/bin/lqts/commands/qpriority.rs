use crate::cli::QpriorityArgs;
use lqts::client::Client;

pub async fn handle(client: &Client, args: QpriorityArgs) -> anyhow::Result<()> {
    let ids: Vec<String> = args.ids.split(',').map(|s| s.trim().to_string()).collect();
    let response = client.qpriority(ids, args.priority).await?;
    println!("Updated priority for {} job(s).", response.updated);
    Ok(())
}
