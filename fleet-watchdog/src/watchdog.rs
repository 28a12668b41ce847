//! Health Watchdog (spec.md §4.4): off-path liveness and usability
//! probing of every instance, classifying failures and triggering
//! recovery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_core::instance::{ProbeClassification, RestartOutcome};
use fleet_core::{AccountName, FleetError};
use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::WatchdogError;
use crate::snapshotter::Snapshotter;

/// Probe tiers evaluated in order, cheaper first (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Failed(ProbeClassification),
}

/// Seam the watchdog uses to perform the three probe tiers and to carry
/// out recovery, implemented by `fleet-controller` — keeps this crate
/// from depending on the controller's instance-table wiring.
#[async_trait]
pub trait RecoveryHooks: Send + Sync {
    /// Tier 1: OS-level PID check.
    async fn process_alive(&self, account: &AccountName) -> bool;
    /// Tier 2: TCP connect plus minimal protocol round-trip.
    async fn port_responsive(&self, account: &AccountName) -> bool;
    /// Tier 3: `evaluate("document.readyState") == "complete"` on the
    /// target tab.
    async fn tab_usable(&self, account: &AccountName) -> bool;

    /// (a)-(f): capture snapshot, terminate, relaunch on the same port
    /// with a fresh profile dir, wait for the adapter to reach `Ready`,
    /// restore the snapshot, reset counters.
    async fn recover(&self, account: &AccountName, classification: ProbeClassification) -> Result<(), FleetError>;
}

/// Per-instance probe cadence and confirmation counting (spec.md §4.4).
#[derive(Debug)]
pub struct HealthWatchdog {
    probe_interval: Duration,
    confirm_count: u32,
    recovery_budget: Duration,
    max_restarts: u32,
    /// Consecutive-failure counters keyed by account, guarded for
    /// concurrent per-instance recovery loops.
    counters: RwLock<std::collections::HashMap<AccountName, u32>>,
}

impl HealthWatchdog {
    pub fn new(probe_interval: Duration, confirm_count: u32, recovery_budget: Duration, max_restarts: u32) -> Self {
        Self {
            probe_interval,
            confirm_count,
            recovery_budget,
            max_restarts,
            counters: RwLock::new(std::collections::HashMap::new()),
        }
    }

    /// Runs the probe loop for a single account until `shutdown` fires.
    /// Never touches the protected port — the probe loop operates purely
    /// in terms of `account`, resolved by `hooks` (spec.md §4.4
    /// "Ordering").
    pub async fn run_for_account(
        &self,
        account: AccountName,
        hooks: Arc<dyn RecoveryHooks>,
        shutdown: fleet_core::Shutdown,
    ) {
        let mut ticker = tokio::time::interval(self.probe_interval);
        loop {
            tokio::select! {
                _ = shutdown.triggered() => return,
                _ = ticker.tick() => {}
            }

            let outcome = self.probe_once(&account, hooks.as_ref()).await;
            match outcome {
                ProbeOutcome::Healthy => {
                    self.counters.write().insert(account.clone(), 0);
                }
                ProbeOutcome::Failed(classification) => {
                    let confirmations = {
                        let mut guard = self.counters.write();
                        let entry = guard.entry(account.clone()).or_insert(0);
                        *entry += 1;
                        *entry
                    };

                    // A dead process is immediately actionable; port and
                    // tab failures require `confirm_count` consecutive
                    // confirmations (spec.md §4.4 cadence).
                    let immediate = matches!(classification, ProbeClassification::ProcessDied);
                    if immediate || confirmations >= self.confirm_count {
                        warn!(account = %account, ?classification, confirmations, "triggering recovery");
                        self.trigger_recovery(&account, classification, hooks.as_ref()).await;
                        self.counters.write().insert(account.clone(), 0);
                    }
                }
            }
        }
    }

    async fn probe_once(&self, account: &AccountName, hooks: &dyn RecoveryHooks) -> ProbeOutcome {
        if !hooks.process_alive(account).await {
            return ProbeOutcome::Failed(ProbeClassification::ProcessDied);
        }
        if !hooks.port_responsive(account).await {
            return ProbeOutcome::Failed(ProbeClassification::PortUnresponsive);
        }
        if !hooks.tab_usable(account).await {
            return ProbeOutcome::Failed(ProbeClassification::TabUnusable);
        }
        ProbeOutcome::Healthy
    }

    async fn trigger_recovery(&self, account: &AccountName, classification: ProbeClassification, hooks: &dyn RecoveryHooks) {
        let deadline = Instant::now() + self.recovery_budget;
        let result = tokio::time::timeout(self.recovery_budget, hooks.recover(account, classification)).await;

        let outcome = match result {
            Ok(Ok(())) if Instant::now() <= deadline => RestartOutcome::Recovered,
            _ => RestartOutcome::Exhausted,
        };
        if outcome == RestartOutcome::Exhausted {
            warn!(account = %account, budget_secs = self.recovery_budget.as_secs(), "recovery exhausted, instance marked Failed");
        } else {
            info!(account = %account, "recovery succeeded, instance back to Ready");
        }
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }
}

/// Classifies a failed login/session as `AuthLost` — reserved for future
/// use by `tab_usable` implementations that can distinguish "page
/// unresponsive" from "page shows a login screen again".
pub fn classify_auth_loss() -> ProbeClassification {
    ProbeClassification::AuthLost
}

/// Restarting an instance is per-instance-locked so recovery never races
/// a command dispatch for the same instance (spec.md §5); this lock is
/// the seam `fleet-controller` acquires before delegating to `recover`.
pub type RecoveryLock = tokio::sync::Mutex<()>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct FlakyThenHealthyHooks {
        failures_remaining: AtomicU32,
        recoveries: Mutex<Vec<ProbeClassification>>,
    }

    #[async_trait]
    impl RecoveryHooks for FlakyThenHealthyHooks {
        async fn process_alive(&self, _account: &AccountName) -> bool {
            true
        }
        async fn port_responsive(&self, _account: &AccountName) -> bool {
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                false
            } else {
                true
            }
        }
        async fn tab_usable(&self, _account: &AccountName) -> bool {
            true
        }
        async fn recover(&self, _account: &AccountName, classification: ProbeClassification) -> Result<(), FleetError> {
            self.recoveries.lock().unwrap().push(classification);
            Ok(())
        }
    }

    #[tokio::test]
    async fn transient_failures_below_confirm_count_do_not_trigger_recovery() {
        let watchdog = HealthWatchdog::new(Duration::from_millis(5), 3, Duration::from_secs(5), 5);
        let hooks = Arc::new(FlakyThenHealthyHooks {
            failures_remaining: AtomicU32::new(2),
            recoveries: Mutex::new(vec![]),
        });
        let account = AccountName::from("acc0");
        for _ in 0..2 {
            let outcome = watchdog.probe_once(&account, hooks.as_ref()).await;
            assert!(matches!(outcome, ProbeOutcome::Failed(ProbeClassification::PortUnresponsive)));
        }
        assert!(hooks.recoveries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn process_died_is_immediately_actionable() {
        struct DeadHooks;
        #[async_trait]
        impl RecoveryHooks for DeadHooks {
            async fn process_alive(&self, _account: &AccountName) -> bool {
                false
            }
            async fn port_responsive(&self, _account: &AccountName) -> bool {
                true
            }
            async fn tab_usable(&self, _account: &AccountName) -> bool {
                true
            }
            async fn recover(&self, _account: &AccountName, _classification: ProbeClassification) -> Result<(), FleetError> {
                Ok(())
            }
        }
        let watchdog = HealthWatchdog::new(Duration::from_millis(5), 3, Duration::from_secs(5), 5);
        let outcome = watchdog.probe_once(&AccountName::from("acc0"), &DeadHooks).await;
        assert!(matches!(outcome, ProbeOutcome::Failed(ProbeClassification::ProcessDied)));
    }
}
