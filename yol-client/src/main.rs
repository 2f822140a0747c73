use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yol_client::{BackendClient, LogNotifier, NotificationSync, SyncScheduler};
use yol_store::MemorySessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yol_client=info,yol_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = yol_store::app_config::Config::load()?;
    tracing::info!("Syncing notifications from {}", config.backend.base_url);

    let backend = Arc::new(BackendClient::new(
        &config.backend,
        Arc::new(MemorySessionStore::new()),
    )?);

    match &config.sync.phone {
        Some(phone) => {
            if let Err(err) = backend.sign_in(phone, config.sync.display_name.as_deref()).await {
                tracing::warn!(error = %err, "sign-in failed, running signed out");
            }
        }
        None => tracing::info!("no sync.phone configured, running signed out"),
    }

    let sync = Arc::new(NotificationSync::new(backend, Arc::new(LogNotifier)));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = SyncScheduler::from_config(&config.sync).spawn(sync, shutdown_rx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);
    handle.await?;
    Ok(())
}
