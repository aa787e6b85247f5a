use crate::cli::QsubArgs;
use anyhow::{anyhow, Context};
use lqts::client::Client;
use lqts::core::api::QsubRequest;
use lqts::core::job::{JobId, JobSpec};
use lqts::utils::{parse_job_id_selectors, parse_time_limit};

pub async fn handle(client: &Client, args: QsubArgs) -> anyhow::Result<()> {
    let working_dir = match args.working_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to get current directory")?,
    };

    let mut depends = lqts::core::job::DependencyIds::new();
    if let Some(raw) = &args.depends_on {
        for selector in parse_job_id_selectors(raw)? {
            let index = selector
                .index
                .ok_or_else(|| anyhow!("--depends-on requires a specific job index, got '{}'", selector.group))?;
            depends.push(JobId::new(selector.group, index));
        }
    }

    let walltime = args.walltime.map(|w| parse_time_limit(&w)).transpose()?;

    let spec = JobSpec::builder(args.command.into_iter().map(Into::into).collect(), working_dir)
        .log_file(args.log_file)
        .priority(args.priority)
        .cores(args.cores)
        .depends(depends)
        .walltime(walltime)
        .build();

    let response = client.qsub(QsubRequest { jobs: vec![spec] }).await?;
    for id in response.job_ids {
        println!("Submitted job {id}");
    }
    Ok(())
}
