use anyhow::{Context, Result};
use autoland::{CliArgs, Config, GitHub, Processor};
use clap::Parser;

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    // Default to info: the run log IS the user-visible output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::resolve(CliArgs::parse())?;
    let forge = GitHub::new(&config.token, config.repo.clone())?;
    let processor = Processor::new(forge, config)
        .await
        .context("failed to resolve the authenticated user")?;

    processor.run().await?;
    tracing::info!("finished processing all pull requests");
    Ok(())
}
