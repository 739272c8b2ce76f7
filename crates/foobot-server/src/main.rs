use anyhow::{bail, Context};
use clap::Parser;
use foobot_client::FoobotClient;
use foobot_config::ConfigLoader;
use foobot_logging::init_logging;
use foobot_server::{
    client_config, poller_settings, resolve_devices, serve_until, start_pollers,
};
use foobot_shutdown::SignalHandler;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Print the effective configuration (API key hidden) and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new(&args.config)
        .load()
        .with_context(|| format!("failed to load config from {}", args.config))?;

    if args.print_config {
        println!("{}", config.to_toml_redacted()?);
        return Ok(());
    }

    init_logging(&config.logging)?;
    info!(config = %args.config, version = env!("CARGO_PKG_VERSION"), "Starting Foobot poller");

    let client = Arc::new(FoobotClient::new(client_config(&config))?);
    let devices = resolve_devices(&config, client.as_ref())
        .await
        .context("failed to resolve devices")?;
    if devices.is_empty() {
        bail!("no devices to poll");
    }

    let (handler, _rx) = SignalHandler::new();
    let service = start_pollers(devices, poller_settings(&config), client, handler.clone());
    info!(devices = service.device_count(), "Pollers started");

    let states = serve_until(
        service,
        handler.wait_for_system_signal(),
        config.shutdown_timeout(),
    )
    .await
    .context("failed to listen for shutdown signals")?;
    info!(devices = states.len(), "Shutdown complete");
    Ok(())
}
