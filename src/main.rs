use anyhow::Result;
use clap::Parser;
use workshop_perf::cli::{Cli, CliHandler};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set log level based on debug flag; reports go to stdout, logs to stderr
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(log_level)
        .init();

    if cli.debug {
        tracing::debug!("Debug mode enabled - verbose logging active");
    }

    let handler = CliHandler::new(cli.config_dir, cli.format)?;
    handler.handle_command(cli.command).await?;

    Ok(())
}
