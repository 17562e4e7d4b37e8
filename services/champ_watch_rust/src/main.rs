use anyhow::{Context, Result};
use champ_watch_rust::{ChampWatcher, Config, Sources, WatchSettings};
use dotenv::dotenv;
use frc_watch_core::clients::{
    http_client, DiscordClient, NexusClient, StatboticsClient, TbaClient,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting champ watch...");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return Err(e);
        }
    };

    // One HTTP session for every client, dropped on exit
    let http = http_client(config.request_timeout).context("Failed to build HTTP client")?;

    let sources = Sources {
        results: Arc::new(TbaClient::with_base_url(
            http.clone(),
            config.tba_api_key.clone(),
            &config.tba_base_url,
        )),
        live: Arc::new(NexusClient::with_base_url(
            http.clone(),
            config.nexus_api_key.clone(),
            &config.nexus_base_url,
        )),
        predictions: Arc::new(StatboticsClient::with_base_url(
            http.clone(),
            &config.statbotics_base_url,
        )),
        dispatcher: Arc::new(DiscordClient::with_base_url(
            http,
            config.discord_bot_token.clone(),
            &config.discord_base_url,
        )),
    };

    let mut watcher = ChampWatcher::new(WatchSettings::from(&config), sources);

    if let Err(e) = watcher.connect().await {
        error!("Not starting watch loop: {:#}", e);
        return Err(e);
    }

    watcher.backfill().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
                // Dropping the sender would stop the loop
                std::future::pending::<()>().await;
            }
        }
    });

    watcher.run(shutdown_rx).await;

    info!("Champ watch stopped");
    Ok(())
}
