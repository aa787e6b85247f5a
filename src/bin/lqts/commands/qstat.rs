use crate::cli::{JobgroupArgs, QstatArgs};
use lqts::client::Client;
use lqts::core::api::QstatQuery;
use lqts::core::job::{Job, JobStatus};
use lqts::utils::format_duration;
use owo_colors::OwoColorize;
use tabled::builder::Builder;
use tabled::settings::Style;

pub async fn handle(client: &Client, args: QstatArgs) -> anyhow::Result<()> {
    let jobs = client
        .qstat(QstatQuery {
            running: args.running,
            queued: args.queued,
            completed: args.completed,
        })
        .await?;
    print_table(&jobs);
    Ok(())
}

pub async fn handle_summary(client: &Client) -> anyhow::Result<()> {
    let summary = client.qsummary().await?;
    println!("Running: {}  Queued: {}", summary.running, summary.queued);
    Ok(())
}

pub async fn handle_jobgroup(client: &Client, args: JobgroupArgs) -> anyhow::Result<()> {
    let jobs = client.jobgroup(args.group).await?;
    print_table(&jobs);
    Ok(())
}

fn print_table(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs.");
        return;
    }

    let mut builder = Builder::new();
    builder.push_record(["ID", "STATUS", "PRI", "CORES", "WALLTIME", "COMMAND"]);

    let mut sorted: Vec<&Job> = jobs.iter().collect();
    sorted.sort_by_key(|j| (j.job_id.group, j.job_id.index));

    for job in sorted {
        let command = job
            .job_spec
            .command
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        builder.push_record([
            job.job_id.to_string(),
            colorize_status(job.status),
            job.job_spec.priority.to_string(),
            job.job_spec.cores.to_string(),
            format_duration(job.walltime()),
            command,
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");
}

fn colorize_status(status: JobStatus) -> String {
    let letter = status.to_string();
    match status {
        JobStatus::Running => letter.green().to_string(),
        JobStatus::Completed => letter.blue().to_string(),
        JobStatus::Queued | JobStatus::Initialized | JobStatus::Paused => letter.yellow().to_string(),
        JobStatus::Error | JobStatus::WalltimeExceeded | JobStatus::Deleted => letter.red().to_string(),
    }
}
