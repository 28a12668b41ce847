//! Fleet Controller (spec.md §4.6): owns the collection of Session
//! Adapters; exposes typed "run on one" / "run on all" fan-out; aggregates
//! results.

use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleet_adapter::SessionAdapter;
use fleet_core::command::{CommandMethod, CommandOutcome, CommandRecord};
use fleet_core::instance::{InstanceRecord, InstanceState, ProbeClassification, RestartEvent};
use fleet_core::routing::RoutingTable;
use fleet_core::AccountName;
use parking_lot::RwLock;

use crate::error::ControllerError;

/// Fan-out slack added on top of a method's own timeout, so a slow-but-
/// still-within-budget adapter isn't cut off by the join deadline before
/// its own `evaluate` timeout would have fired (spec.md §4.6).
const FAN_OUT_SLACK: Duration = Duration::from_millis(500);

/// Read-only projection of one instance, for the Dashboard API
/// (spec.md §4.6, §4.8). Carries the SPEC_FULL §3 supplemental
/// `restart_history` and the last probe classification.
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstanceView {
    pub account_name: AccountName,
    pub port: u16,
    pub state: InstanceState,
    pub consecutive_failures: u32,
    pub last_healthy_at: Option<DateTime<Utc>>,
    pub restart_attempts: u32,
    pub injection_generation: u64,
    pub restart_history: Vec<RestartEvent>,
    pub last_classification: Option<ProbeClassification>,
}

impl From<&InstanceRecord> for InstanceView {
    fn from(record: &InstanceRecord) -> Self {
        Self {
            account_name: record.account_name.clone(),
            port: record.port,
            state: record.state,
            consecutive_failures: record.consecutive_failures,
            last_healthy_at: record.last_healthy_at,
            restart_attempts: record.restart_attempts,
            injection_generation: record.injection_generation,
            restart_history: record.restart_history.iter().cloned().collect(),
            last_classification: record.restart_history.back().map(|e| e.classification),
        }
    }
}

struct Managed {
    adapter: Arc<SessionAdapter>,
    record: InstanceRecord,
}

/// Owns the process-wide instance table and routing table, each behind
/// its own lock, with exactly one owner for mutation (spec.md §9
/// "process-wide registries").
pub struct FleetController {
    instances: RwLock<IndexMap<AccountName, Managed>>,
    routing: RwLock<RoutingTable>,
}

impl std::fmt::Debug for FleetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FleetController").finish_non_exhaustive()
    }
}

impl FleetController {
    pub fn new(routing: RoutingTable) -> Self {
        Self { instances: RwLock::new(IndexMap::new()), routing: RwLock::new(routing) }
    }

    /// Registers a freshly `Ready` adapter under the instance table.
    pub fn register(&self, adapter: Arc<SessionAdapter>, record: InstanceRecord) {
        self.instances.write().insert(record.account_name.clone(), Managed { adapter, record });
    }

    pub fn deregister(&self, account: &AccountName) {
        self.instances.write().remove(account);
    }

    /// Hot-reloads the routing table (spec.md §6) without restarting any
    /// instance.
    pub fn reload_routing(&self, routing: RoutingTable) -> Result<(), String> {
        routing.validate()?;
        *self.routing.write() = routing;
        Ok(())
    }

    pub fn routing(&self) -> RoutingTable {
        self.routing.read().clone()
    }

    fn adapter_for(&self, account: &AccountName) -> Option<Arc<SessionAdapter>> {
        self.instances.read().get(account).map(|m| m.adapter.clone())
    }

    /// Full instance record (including `profile_dir`, not part of the
    /// dashboard-facing [`InstanceView`]) for recovery wiring.
    pub fn record_for(&self, account: &AccountName) -> Option<InstanceRecord> {
        self.instances.read().get(account).map(|m| m.record.clone())
    }

    /// `call_one(account_name, method, args)` (spec.md §4.6).
    pub async fn call_one(&self, account: &AccountName, method: CommandMethod) -> Result<CommandOutcome, ControllerError> {
        let adapter = self.adapter_for(account).ok_or_else(|| ControllerError::UnknownAccount(account.clone()))?;
        Ok(dispatch(&adapter, method).await)
    }

    /// `call_all(method, args)` (spec.md §4.6): dispatches concurrently
    /// across every registered adapter; a panicking adapter task
    /// surfaces as an `Error` result for that account only — it never
    /// takes down the fan-out (SPEC_FULL §4.6).
    pub async fn call_all(&self, method: CommandMethod) -> CommandRecord {
        self.call_accounts(self.all_accounts(), method).await
    }

    /// Fan-out restricted to a named subset, used by the Intent Router's
    /// strategy routing (spec.md §4.7).
    pub async fn call_accounts(&self, accounts: Vec<AccountName>, method: CommandMethod) -> CommandRecord {
        let mut record = CommandRecord::new(method.clone());
        let deadline = method.timeout() + FAN_OUT_SLACK;

        let mut handles = Vec::with_capacity(accounts.len());
        for account in accounts {
            let Some(adapter) = self.adapter_for(&account) else {
                record.record(&account, CommandOutcome::Error("unknown account".to_string()));
                continue;
            };
            let method = record.method.clone();
            handles.push((account, tokio::spawn(async move { dispatch(&adapter, method).await })));
        }

        for (account, handle) in handles {
            let outcome = match tokio::time::timeout(deadline, handle).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(join_error)) => CommandOutcome::Error(format!("adapter task panicked: {join_error}")),
                Err(_) => CommandOutcome::Timeout,
            };
            record.record(&account, outcome);
        }
        record
    }

    fn all_accounts(&self) -> Vec<AccountName> {
        self.instances.read().keys().cloned().collect()
    }

    /// `snapshot() → [InstanceView]` (spec.md §4.6): read-only projection
    /// for the dashboard.
    pub fn snapshot(&self) -> Vec<InstanceView> {
        self.instances.read().values().map(|m| InstanceView::from(&m.record)).collect()
    }

    /// First-class reconciliation primitive (SPEC_FULL §4.3): the
    /// recommended follow-up after a `Timeout`, rather than leaving
    /// "re-read state before retrying" as documentation-only advice.
    pub async fn reconcile(&self, account: &AccountName) -> Result<CommandOutcome, ControllerError> {
        self.call_one(account, CommandMethod::ReadState).await
    }

    /// Updates the stored record for `account`, e.g. after a watchdog
    /// state transition. No-op if the account is unknown.
    pub fn update_record(&self, account: &AccountName, f: impl FnOnce(&mut InstanceRecord)) {
        if let Some(managed) = self.instances.write().get_mut(account) {
            f(&mut managed.record);
        }
    }
}

async fn dispatch(adapter: &SessionAdapter, method: CommandMethod) -> CommandOutcome {
    match method {
        CommandMethod::Enter { symbol, qty, side, tp_ticks, sl_ticks, tick_size } => {
            adapter.enter(symbol, qty, side, tp_ticks, sl_ticks, tick_size).await
        }
        CommandMethod::ScaleEnter { symbol, levels, side, tp_ticks, sl_ticks, tick_size } => {
            adapter.scale_enter(symbol, levels, side, tp_ticks, sl_ticks, tick_size).await
        }
        CommandMethod::Exit { symbol, mode } => adapter.exit(symbol, mode).await,
        CommandMethod::SetSymbol { symbol } => adapter.set_symbol(symbol).await,
        CommandMethod::ReadState => adapter.read_state().await,
    }
}
