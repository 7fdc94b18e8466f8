use anyhow::Result;
use clap::Parser;
use mc_sleepproxy::handler::SharedState;
use mc_sleepproxy::{assets, config, listener, wake, whitelist};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;

/// Protocol-aware reverse proxy that impersonates a sleeping Minecraft
/// server and wakes it on the first real login attempt.
#[derive(Parser)]
#[command(name = "mc-sleepproxy")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "mcsleepproxy.toml")]
    config: PathBuf,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let config = config::load_config(&cli.config);
    let whitelist = whitelist::load(&config.whitelist_path);
    let icon = assets::load_icon(&config.icon_path);
    let wake = wake::WakeTrigger::new(
        config.backend_mac.clone(),
        config.wake_command.clone(),
        Duration::from_secs(config.wake_cooldown_secs),
    );

    let listen_host = config.listen_host.clone();
    let listen_port = config.listen_port;

    let state = Arc::new(SharedState {
        config,
        whitelist,
        wake,
        icon,
    });

    listener::serve(state, &listen_host, listen_port).await?;

    Ok(())
}
