use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use taskq_daemon::clock::SystemClock;
use taskq_daemon::config::Config;
use taskq_daemon::{routes, Dispatcher, StoreClient};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (.yaml, .yml or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Address to listen on, e.g. 0.0.0.0:8080
    #[arg(long)]
    listen: Option<String>,
    /// SQLite database path
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    config.merge_overrides(args.listen, args.db);

    common::logging::setup_logging(&config.logging)?;
    log::info!("Starting taskq-daemon...");

    let store = StoreClient::from_config(&config.store);
    let migrate_store = store.clone();
    tokio::task::spawn_blocking(move || migrate_store.migrate())
        .await?
        .with_context(|| format!("Failed to prepare database at {:?}", config.store.path))?;

    let dispatcher = Dispatcher::new(store, Arc::new(SystemClock));
    let app = routes::router(dispatcher);

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    log::info!("Listening on {}", config.server.listen);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("taskq-daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
