mod api;
mod catalog;
mod config;
mod errors;
mod format;
mod models;
mod query;
mod store;
mod youtube;

use std::error::Error;
use std::path::Path;

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

use crate::catalog::Catalog;
use crate::config::Config;

fn init_tracing(level: LevelFilter, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stdout = fmt::layer().json();
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "video-catalog.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(level)
                .with(stdout)
                .with(fmt::layer().json().with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(level).with(stdout).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::from_env()?;
    let _guard = init_tracing(config.log_level, config.log_dir.as_deref());

    if config.api_key.is_none() {
        warn!("YOUTUBE_API_KEY is not set, every upstream request will fail");
    }

    let catalog = Catalog::from_config(&config);
    if config.rehydrate {
        match catalog.store.rehydrate() {
            Ok(true) => info!("Rehydrated store from {}", config.storage_dir.display()),
            Ok(false) => info!("No persisted store state found"),
            Err(e) => warn!(error = %e, "Failed to rehydrate store, starting empty"),
        }
    }
    let _sync = catalog.spawn_store_sync();
    catalog.seed_initial().await;

    let app = api::create_router(catalog);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
