mod cli;
mod input;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use voidcheck_core::{load_dotenv, Config};
use voidcheck_lookup::{LookupPipeline, TransportOptions};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs on stderr, results on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    let config = resolve_config(&args);
    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&config.redacted_summary())?);
        return Ok(());
    }
    config.log_summary();

    let options = input::attach_tls_material(TransportOptions::from_config(&config), &config.tls)
        .context("failed to load TLS material")?;
    let pipeline =
        LookupPipeline::from_config(&config, &options).context("failed to set up lookups")?;

    let indicators = input::read_indicators(args.input.as_deref())?;
    info!(count = indicators.len(), "Indicators loaded");

    let results = pipeline
        .lookup(&indicators)
        .await
        .context("lookup batch failed")?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

/// Env config for the selected profile, with CLI flags layered on top.
fn resolve_config(args: &CliArgs) -> Config {
    let mut config = Config::for_profile(&args.profile);

    if let Some(key) = &args.api_key {
        config.api.api_key = Some(key.clone());
    }
    if let Some(url) = &args.url {
        config.api.url = url.clone();
    }
    if let Some(schema) = args.schema {
        config.api.schema = schema;
    }
    if let Some(blocklisted_only) = args.blocklisted_override() {
        config.lookup.blocklisted_only = blocklisted_only;
    }
    if let Some(concurrency) = args.concurrency {
        config.lookup.concurrency = concurrency;
    }
    if let Some(policy) = args.failure_policy {
        config.lookup.failure_policy = policy;
    }

    config
}
