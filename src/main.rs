//! # Zenlayer Cloud Provider
//!
//! Runs one host callback per invocation and prints the response as JSON.
//!
//! ## Environment
//!
//! - `ZENLAYERCLOUD_ACCESS_KEY_ID` / `ZENLAYERCLOUD_ACCESS_KEY_PASSWORD` - API credentials
//! - `ZENLAYERCLOUD_ENDPOINT` - API endpoint (default `https://console.zenlayer.com`)
//! - `ZENLAYERCLOUD_REQUEST_CLIENT` - value of the `X-ZC-Request-Client` header
//! - `ZENLAYERCLOUD_HTTP_TIMEOUT_SECS` / `ZENLAYERCLOUD_RETRY_INTERVAL_MS`
//! - `LOG_LEVEL` / `LOG_FORMAT` (`json` or `text`), or `RUST_LOG`

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use zenlayercloud_provider::cli::{Cli, Command};
use zenlayercloud_provider::client::VendorClient;
use zenlayercloud_provider::config::ProviderConfig;
use zenlayercloud_provider::constants::{BUILD_GIT_HASH, DEFAULT_RETRY_JITTER};
use zenlayercloud_provider::engine::backoff::JitteredBackoff;
use zenlayercloud_provider::observability::{logging, metrics};
use zenlayercloud_provider::provider::Provider;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ProviderConfig::from_env();

    logging::init_logging(&config.log)?;
    metrics::register_metrics()?;
    debug!(version = env!("CARGO_PKG_VERSION"), git = BUILD_GIT_HASH, "starting");

    if !matches!(cli.command, Command::Types) {
        config.validate().context("Invalid provider configuration")?;
    }

    let client = VendorClient::new(&config).context("Failed to build vendor client")?;
    let provider = Provider::new(&client);

    let ctx = cli.operation_context().with_backoff(JitteredBackoff::new(
        config.retry_interval(),
        DEFAULT_RETRY_JITTER,
    ));

    // Ctrl-C cancels between retry attempts; in-flight calls complete
    let cancel = ctx.cancellation().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });

    let output = cli.execute(&provider, &ctx).await?;
    println!("{}", output.to_json()?);

    if cli.dump_metrics {
        eprintln!("{}", metrics::gather_text()?);
    }

    if output.has_errors() {
        info!("command finished with errors");
        std::process::exit(1);
    }
    Ok(())
}
