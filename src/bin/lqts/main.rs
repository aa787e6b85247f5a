use clap::Parser;

mod cli;
mod commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::LqtsCli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(args.verbose.tracing_level_filter().into())
                .from_env_lossy(),
        )
        .init();

    lqts::tls::ensure_rustls_provider_installed();

    let config = lqts::config::load_config(args.config.as_ref())?;
    let client = lqts::client::Client::build(&config)?;

    commands::handle_commands(client, args.command).await
}
