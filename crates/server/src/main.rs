use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use http_api::{BasicCredentials, HttpState};
use monitor_app::{AccountingEngine, MonitorConfig, MonitorService, SysinfoCounter, poller};
use monitor_store::StateStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("monitor_server=info,monitor_app=info,http_api=info")
        }))
        .init();

    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = std::fs::create_dir_all(&config.data_dir) {
        eprintln!(
            "cannot create data directory {}: {err}",
            config.data_dir.display()
        );
        return ExitCode::FAILURE;
    }

    let store = StateStore::new(config.state_path());
    tracing::info!(path = %store.path().display(), "loading accounting state");
    let engine = AccountingEngine::load(store);
    let counter = Arc::new(SysinfoCounter::new());
    let service = Arc::new(MonitorService::new(engine, counter, config.cap_bytes()));

    poller::spawn(service.clone(), config.poll_interval);

    let state = HttpState::new(
        service,
        BasicCredentials {
            username: config.username.clone(),
            password: config.password.clone(),
        },
    );
    let app = http_api::router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("cannot bind {}: {err}", config.bind_addr);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        addr = %config.bind_addr,
        cap_gb = config.cap_gb,
        poll_secs = config.poll_interval.as_secs(),
        "egress monitor listening"
    );

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        eprintln!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("ctrl-c handler failed: {err}");
        return;
    }
    tracing::info!("shutdown requested");
}
