//! Binary entrypoint: loads `fleet.toml`, brings up one browser instance
//! per configured account, wires the Health Watchdog to the Fleet
//! Controller, and serves the Intent Router / Dashboard API (SPEC_FULL
//! §2, §6).
//!
//! This is the only crate in the workspace allowed to use `anyhow` —
//! every library crate below it returns a typed `FleetError`
//! (SPEC_FULL §2).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fleet_adapter::SessionAdapter;
use fleet_browser::{CdpDebugTransport, DebugTransport, ProcProcessInspector, Supervisor};
use fleet_controller::{ControllerRecoveryHooks, FleetController};
use fleet_core::config::FleetConfig;
use fleet_core::{AccountName, Shutdown};
use fleet_watchdog::{HealthWatchdog, Snapshotter};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "fleet-bin", about = "Browser fleet orchestrator")]
struct Cli {
    /// Path to the `fleet.toml` configuration file.
    #[arg(long, default_value = "fleet.toml")]
    config: String,

    /// Emit structured JSON logs instead of the human-readable format.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.json_logs {
        fleet_core::logging::init_json_logging();
    } else {
        fleet_core::logging::init_logging();
    }

    let raw = tokio::fs::read_to_string(&cli.config)
        .await
        .with_context(|| format!("reading config file {}", cli.config))?;
    let config: FleetConfig = toml::from_str(&raw).context("parsing fleet.toml")?;
    config.validate().map_err(anyhow::Error::msg).context("validating fleet.toml")?;

    info!(config_path = %cli.config, "starting browser fleet orchestrator");

    let shutdown = Shutdown::new();
    let transport: Arc<dyn DebugTransport> = Arc::new(CdpDebugTransport::default());
    let inspector = ProcProcessInspector::default();
    let supervisor = Arc::new(
        Supervisor::new(config.protected_port, config.browser_binary.clone(), inspector)
            .with_startup_timeout(Duration::from_secs(30)),
    );
    let snapshotter = Arc::new(Snapshotter::new(&config.data_dir));

    let controller = Arc::new(FleetController::new(config.routing.as_table()));
    let hooks = Arc::new(ControllerRecoveryHooks::new(
        controller.clone(),
        supervisor.clone(),
        snapshotter.clone(),
        transport.clone(),
        config.trading_host.clone(),
    ));

    let accounts: Vec<AccountName> = config.credentials.keys().map(|name| AccountName::from(name.as_str())).collect();
    if accounts.is_empty() {
        warn!("no accounts configured under [credentials]; fleet will serve requests with zero instances");
    }

    let mut watchdog_handles = Vec::new();
    let mut next_port = config.managed_port_base;
    for account in &accounts {
        let port = next_port;
        next_port += 1;

        let existing_ports: HashSet<u16> = controller.snapshot().into_iter().map(|v| v.port).collect();
        let launched = match supervisor.launch(account.clone(), port, &existing_ports).await {
            Ok(launched) => launched,
            Err(error) => {
                warn!(%account, %error, "failed to launch instance at startup, skipping");
                continue;
            }
        };
        hooks.track(account.clone(), launched.child.id().unwrap_or(0));

        let adapter = Arc::new(SessionAdapter::new(account.clone(), port, config.trading_host.clone(), transport.clone()));
        if let Err(error) = adapter.ensure_ready().await {
            warn!(%account, %error, "instance failed to reach Ready at startup, leaving it out of fan-out");
            continue;
        }

        let mut record = launched.record;
        record.injection_generation = adapter.injection_generation();
        controller.register(adapter, record);
        info!(%account, port, "instance ready");

        let watchdog = Arc::new(HealthWatchdog::new(
            Duration::from_secs(config.watchdog.probe_interval_secs),
            config.watchdog.confirm_count,
            Duration::from_secs(config.watchdog.recovery_budget_secs),
            config.watchdog.max_restarts,
        ));
        let watchdog_account = account.clone();
        let watchdog_hooks = hooks.clone() as Arc<dyn fleet_watchdog::RecoveryHooks>;
        let watchdog_shutdown = shutdown.child();
        watchdog_handles.push(tokio::spawn(async move {
            watchdog.run_for_account(watchdog_account, watchdog_hooks, watchdog_shutdown).await;
        }));
    }

    let bind_addr = config.http.bind_addr.clone();
    let state = fleet_http::AppState::new(controller.clone(), config.clone(), cli.config.clone());
    let app = fleet_http::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding HTTP listener on {bind_addr}"))?;
    info!(%bind_addr, "serving Intent Router and Dashboard API");

    let server_shutdown = shutdown.child();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_shutdown.triggered().await })
            .await
    });

    wait_for_termination().await;
    info!("shutdown signal received, stopping fleet");

    let mut handles = watchdog_handles;
    handles.push(tokio::spawn(async move {
        let _ = server.await;
    }));
    shutdown.join_with_budget(handles, Duration::from_secs(20)).await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("installing SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
