//! # relayhubd: relayhub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Start the MQTT publisher
//! - Construct the correlation service, injecting adapters via port traits
//! - Build the axum router and serve until SIGTERM/SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use relayhub_adapter_http_axum::state::AppState;
use relayhub_adapter_mqtt::{MqttPublisher, TopicTemplate};
use relayhub_adapter_storage_sqlite_sqlx::{SqliteDeviceDirectory, SqliteResponseStore};
use relayhub_app::services::correlation_service::CorrelationService;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = relayhub_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    let directory = SqliteDeviceDirectory::new(pool.clone());
    let store = SqliteResponseStore::new(pool);

    // Messaging
    let publisher = Arc::new(MqttPublisher::connect(&config.mqtt));
    let topics = TopicTemplate::from_config(&config.mqtt);

    // Services
    let correlation = CorrelationService::new(directory, store, Arc::clone(&publisher), topics)
        .with_settings(config.correlation.settings());

    // HTTP
    let app = relayhub_adapter_http_axum::router::build(AppState::new(correlation));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "relayhubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(publisher) = Arc::into_inner(publisher) {
        publisher.shutdown();
    }
    tracing::info!("relayhubd stopped");

    Ok(())
}

/// Resolve on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl-C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
