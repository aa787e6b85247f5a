use crate::cli::QdelArgs;
use lqts::client::Client;

pub async fn handle(client: &Client, args: QdelArgs) -> anyhow::Result<()> {
    let ids: Vec<String> = args.ids.split(',').map(|s| s.trim().to_string()).collect();
    let response = client.qdel(ids).await?;
    if response.deleted_jobs.is_empty() {
        println!("No matching jobs found.");
    } else {
        for id in response.deleted_jobs {
            println!("Deleted job {id}");
        }
    }
    Ok(())
}
