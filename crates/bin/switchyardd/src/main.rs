//! # switchyardd: switchyard daemon
//!
//! Composition root that wires all adapters together and starts the loops
//! and the console API.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialise `tracing`
//! - Construct the device registry, HTTP clients and mDNS browser
//! - Start the discovery, probe, reconcile, sun-time and rule-reload loops
//! - Build the axum router and serve it
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;
mod reload;

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use switchyard_adapter_http_axum::router;
use switchyard_adapter_http_axum::state::AppState;
use switchyard_adapter_http_reqwest::{HttpDeviceClient, SunriseSunsetClient};
use switchyard_adapter_mdns::MdnsDiscovery;
use switchyard_app::discovery::DiscoveryLoop;
use switchyard_app::overrides::OverrideTable;
use switchyard_app::ports::SystemClock;
use switchyard_app::probe::ProbeLoop;
use switchyard_app::reconciler::Reconciler;
use switchyard_app::registry::DeviceRegistry;
use switchyard_app::services::console_service::ConsoleService;
use switchyard_app::sun::{SunTimeCache, SunTimeResolver};
use switchyard_domain::manual_override::ManualOverrides;

use crate::config::Config;
use crate::reload::{RELOAD_INTERVAL, RuleReloader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    let utc_offset = config.utc_offset();
    let registry = Arc::new(DeviceRegistry::new());
    let client = Arc::new(HttpDeviceClient::new(&config.device_http())?);
    let sun = Arc::new(SunTimeCache::default());
    let (rules_tx, rules_rx) = watch::channel(Arc::new(config.rules()));
    let overrides = Arc::new(OverrideTable::new(ManualOverrides::new(TimeDelta::seconds(
        config.reconcile.manual_grace_secs,
    ))));
    let discovery = MdnsDiscovery::new()?;

    // Background loops
    let tasks = [
        DiscoveryLoop::new(
            discovery.clone(),
            Arc::clone(&registry),
            config.discovery.service_type.clone(),
            Duration::from_secs(config.discovery.refresh_secs),
        )
        .start(),
        ProbeLoop::new(
            Arc::clone(&client),
            Arc::clone(&registry),
            Arc::new(config.device_profiles()),
            config.probe.failure_threshold,
            Duration::from_secs(config.probe.interval_secs),
        )
        .start(),
        Reconciler::new(
            Arc::clone(&client),
            SystemClock,
            Arc::clone(&registry),
            Arc::clone(&sun),
            rules_rx,
            Arc::clone(&overrides),
            config.programs(),
            utc_offset,
            Duration::from_secs(config.reconcile.interval_secs),
        )
        .start(),
        SunTimeResolver::new(
            SunriseSunsetClient::new(&config.sun_service())?,
            Arc::clone(&sun),
            utc_offset,
            config.sun.offset_secs,
            Duration::from_secs(config.sun.refresh_secs),
        )
        .start(),
        RuleReloader::new(Config::path(), rules_tx, RELOAD_INTERVAL).start(),
    ];

    // HTTP
    let console = ConsoleService::new(client, registry, config.programs());
    let state = AppState::new(Arc::new(console), sun)
        .with_overrides(overrides)
        .with_users(config.server.users.clone());
    if state.credentials.is_empty() {
        tracing::warn!("no console users configured, API is unauthenticated");
    }
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, rules = config.timers.len(), "switchyardd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for task in &tasks {
        task.abort();
    }
    discovery.shutdown();
    tracing::info!("switchyardd stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}
