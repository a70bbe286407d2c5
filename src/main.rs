use anyhow::Result;
use clap::Parser;
use topicmix::{cli::Cli, run};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("topicmix=info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli)
}
