use clap::Parser;

mod cli;
mod commands;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let lqtsd = cli::Lqtsd::parse();

    if let Some(command) = lqtsd.command {
        commands::handle_commands(command);
        return Ok(());
    }

    let config = lqts::config::load_config(lqtsd.config.as_ref())?;

    // A log file in the config routes lqtsd's own tracing output through a
    // non-blocking file appender; otherwise it goes to stderr. This is the
    // daemon's operational log, distinct from each job's own log_file.
    let _log_guard = match &config.log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().unwrap_or_default();
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_env_filter(
                    tracing_subscriber::EnvFilter::builder()
                        .with_default_directive(lqtsd.verbose.tracing_level_filter().into())
                        .from_env_lossy(),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::builder()
                        .with_default_directive(lqtsd.verbose.tracing_level_filter().into())
                        .from_env_lossy(),
                )
                .init();
            None
        }
    };

    server::run(config).await
}
