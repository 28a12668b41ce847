//! Wires the Fleet Controller's instance table to the Health Watchdog's
//! [`RecoveryHooks`] seam (spec.md §4.4 action (a)-(f)): capture
//! snapshot, terminate, relaunch on the same port with a fresh profile
//! dir, wait for `Ready`, restore the snapshot, reset counters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fleet_adapter::SessionAdapter;
use fleet_browser::{DebugTransport, ProcessInspector, Supervisor};
use fleet_core::command::{CommandOutcome, ReadStateSnapshot};
use fleet_core::instance::{InstanceState, ProbeClassification, RestartEvent, RestartOutcome};
use fleet_core::snapshot::{SnapshotRecord, TradingParameters};
use fleet_core::{AccountName, FleetError};
use fleet_watchdog::{RecoveryHooks, Snapshotter};
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use crate::controller::FleetController;

/// Per-instance bookkeeping the recovery path needs that isn't part of
/// the dashboard-facing [`InstanceRecord`](fleet_core::instance::InstanceRecord):
/// the OS PID (owned by the Supervisor's `Child` handle) and a lock
/// excluding concurrent command dispatch during recovery (spec.md §5).
struct RecoveryState {
    pid: u32,
    lock: Arc<AsyncMutex<()>>,
}

/// Implements [`RecoveryHooks`] against a live fleet: the controller's
/// instance table, a process Supervisor, a Snapshotter, and the debug
/// transport used to re-attach after relaunch.
pub struct ControllerRecoveryHooks<I: ProcessInspector + 'static> {
    controller: Arc<FleetController>,
    supervisor: Arc<Supervisor<I>>,
    snapshotter: Arc<Snapshotter>,
    transport: Arc<dyn DebugTransport>,
    trading_host: String,
    states: RwLock<HashMap<AccountName, RecoveryState>>,
}

impl<I: ProcessInspector + 'static> ControllerRecoveryHooks<I> {
    pub fn new(
        controller: Arc<FleetController>,
        supervisor: Arc<Supervisor<I>>,
        snapshotter: Arc<Snapshotter>,
        transport: Arc<dyn DebugTransport>,
        trading_host: impl Into<String>,
    ) -> Self {
        Self {
            controller,
            supervisor,
            snapshotter,
            transport,
            trading_host: trading_host.into(),
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Registers the PID a freshly launched instance runs under, so later
    /// `process_alive`/`recover` calls know what to probe and terminate.
    pub fn track(&self, account: AccountName, pid: u32) {
        self.states.write().insert(account, RecoveryState { pid, lock: Arc::new(AsyncMutex::new(())) });
    }

    fn instance_lock(&self, account: &AccountName) -> Option<Arc<AsyncMutex<()>>> {
        self.states.read().get(account).map(|s| s.lock.clone())
    }
}

#[async_trait]
impl<I: ProcessInspector + 'static> RecoveryHooks for ControllerRecoveryHooks<I> {
    async fn process_alive(&self, account: &AccountName) -> bool {
        let Some(pid) = self.states.read().get(account).map(|s| s.pid) else { return false };
        self.supervisor.enumerate_managed().await.contains(&pid)
    }

    async fn port_responsive(&self, account: &AccountName) -> bool {
        let Some(record) = self.controller.record_for(account) else {
            return false;
        };
        tokio::net::TcpStream::connect(("127.0.0.1", record.port)).await.is_ok()
    }

    async fn tab_usable(&self, account: &AccountName) -> bool {
        let Some(record) = self.controller.record_for(account) else {
            return false;
        };
        let Ok(tabs) = self.transport.list_tabs(record.port).await else { return false };
        let Some(tab) = tabs.into_iter().find(|t| t.url.contains(&self.trading_host)) else { return false };
        let Ok(session) = self.transport.attach(&tab).await else { return false };
        matches!(
            session
                .evaluate("document.readyState", false, std::time::Duration::from_secs(5))
                .await,
            Ok(serde_json::Value::String(ref s)) if s == "complete"
        )
    }

    async fn recover(&self, account: &AccountName, classification: ProbeClassification) -> Result<(), FleetError> {
        let Some(lock) = self.instance_lock(account) else {
            return Err(FleetError::UnknownAccount(account.clone()));
        };
        // Excludes concurrent command dispatch for this instance during
        // recovery, without blocking other instances (spec.md §5).
        let _guard = lock.lock().await;

        self.controller.update_record(account, |record| record.state = InstanceState::Restarting);

        let snapshot = self.capture_snapshot(account).await;
        if let Some(snapshot) = &snapshot {
            let _ = self.snapshotter.capture(snapshot).await;
        }

        let Some(pid) = self.states.read().get(account).map(|s| s.pid) else {
            return Err(FleetError::UnknownAccount(account.clone()));
        };
        let Some(record) = self.controller.record_for(account) else {
            return Err(FleetError::UnknownAccount(account.clone()));
        };
        let port = record.port;

        // Terminate via the Supervisor, then relaunch on the same port
        // with a fresh profile dir.
        self.supervisor.terminate(&record, pid).await;
        self.controller.deregister(account);

        let existing_ports: std::collections::HashSet<u16> =
            self.controller.snapshot().into_iter().map(|v| v.port).filter(|p| *p != port).collect();
        let launched = self.supervisor.launch(account.clone(), port, &existing_ports).await.map_err(|e| {
            FleetError::LaunchFailed { account: account.clone(), reason: e.to_string() }
        })?;
        self.track(account.clone(), launched.child.id().unwrap_or(0));

        let adapter = Arc::new(SessionAdapter::new(account.clone(), port, self.trading_host.clone(), self.transport.clone()));
        adapter.ensure_ready().await.map_err(|e| FleetError::AttachFailed { account: account.clone(), reason: e.to_string() })?;

        if let Some(snapshot) = snapshot {
            let outcome = adapter.set_symbol(snapshot.parameters.symbol.clone()).await;
            if !outcome.is_verified() {
                tracing::warn!(%account, "failed to restore symbol after recovery, proceeding without it");
            }
        }

        let generation = adapter.injection_generation();
        self.controller.register(adapter, launched.record);
        self.controller.update_record(account, |record| {
            record.state = InstanceState::Running;
            record.consecutive_failures = 0;
            record.restart_attempts += 1;
            record.injection_generation = generation;
            record.mark_healthy(chrono::Utc::now());
            record.push_restart_event(RestartEvent { at: chrono::Utc::now(), classification, outcome: RestartOutcome::Recovered });
        });
        self.snapshotter.discard(account).await;

        info!(%account, "recovery complete, instance back to Ready");
        Ok(())
    }
}

impl<I: ProcessInspector + 'static> ControllerRecoveryHooks<I> {
    async fn capture_snapshot(&self, account: &AccountName) -> Option<SnapshotRecord> {
        let outcome = self.controller.reconcile(account).await.ok()?;
        let CommandOutcome::Verified(payload) = outcome else { return None };
        let state: ReadStateSnapshot = payload.state?;
        Some(SnapshotRecord::new(
            account.clone(),
            TradingParameters {
                symbol: state.symbol,
                qty: state.qty,
                tp_ticks: 0,
                sl_ticks: 0,
            },
            state.pending_orders,
            state.positions,
        ))
    }
}
