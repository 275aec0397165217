// Long-running notifier

use std::sync::Arc;

use anyhow::{Context, Result};
use ctfnotify_discord::DiscordClient;
use ctfnotify_storage::SqliteEventStore;
use ctfnotify_worker::NotificationService;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::NotifierConfig;

pub async fn run() -> Result<()> {
    let config = NotifierConfig::from_env()?;

    let store = SqliteEventStore::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    let discord = Arc::new(
        DiscordClient::new(config.discord).context("failed to create Discord client")?,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(e) => error!(error = %e, "failed to listen for ctrl-c, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    let service = NotificationService::new(Arc::new(store), discord.clone(), discord)
        .with_scheduler_config(config.scheduler)
        .with_sweeper_config(config.sweeper);

    info!("ctfnotify notifier starting");
    service.run(shutdown_rx).await?;
    Ok(())
}
