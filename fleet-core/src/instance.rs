//! The per-instance record and its lifecycle state machine (spec.md §3).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::AccountName;

/// Bound on [`InstanceRecord::restart_history`] — a SPEC_FULL §3
/// supplemental field surfaced over the Dashboard API so an operator can
/// see recent recovery activity without grepping `logs/crashes/`.
pub const RESTART_HISTORY_CAPACITY: usize = 16;

/// Lifecycle states of a managed browser instance (spec.md §3).
///
/// ```text
/// Starting -> Running -> Degraded -> Restarting -> Running
///                            |                        |
///                            +------ (ceiling) ------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum InstanceState {
    /// Supervisor has launched the process; adapter has no session yet.
    Starting,
    /// Adapter reached `Ready`; instance serves commands.
    Running,
    /// Watchdog confirmed a probe failure; recovery has not yet begun.
    Degraded,
    /// Recovery is in progress (snapshot taken, process being recycled).
    Restarting,
    /// Recovery budget exceeded; instance is removed from fan-out.
    Failed,
}

impl InstanceState {
    /// Whether the instance currently participates in command fan-out.
    pub fn is_fannable(&self) -> bool {
        matches!(self, InstanceState::Running)
    }
}

/// One entry in [`InstanceRecord::restart_history`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RestartEvent {
    pub at: DateTime<Utc>,
    pub classification: ProbeClassification,
    pub outcome: RestartOutcome,
}

/// Watchdog failure classification (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ProbeClassification {
    ProcessDied,
    PortUnresponsive,
    TabUnusable,
    AuthLost,
}

/// Result of a single recovery attempt, recorded for dashboard visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum RestartOutcome {
    Recovered,
    Exhausted,
}

/// One managed browser instance (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstanceRecord {
    pub account_name: AccountName,
    pub port: u16,
    pub profile_dir: String,
    pub state: InstanceState,
    pub consecutive_failures: u32,
    pub last_healthy_at: Option<DateTime<Utc>>,
    pub restart_attempts: u32,
    pub injection_generation: u64,
    /// Bounded ring buffer (capacity [`RESTART_HISTORY_CAPACITY`]) of past
    /// recovery events, most recent last. SPEC_FULL §3 supplemental field;
    /// never load-bearing for any invariant.
    pub restart_history: VecDeque<RestartEvent>,
}

impl InstanceRecord {
    /// A freshly launched instance, as produced by the Supervisor before
    /// the Session Adapter has attached.
    pub fn new(account_name: AccountName, port: u16, profile_dir: impl Into<String>) -> Self {
        Self {
            account_name,
            port,
            profile_dir: profile_dir.into(),
            state: InstanceState::Starting,
            consecutive_failures: 0,
            last_healthy_at: None,
            restart_attempts: 0,
            injection_generation: 0,
            restart_history: VecDeque::with_capacity(RESTART_HISTORY_CAPACITY),
        }
    }

    /// Record a successful probe: resets the failure counter and stamps
    /// `last_healthy_at`.
    pub fn mark_healthy(&mut self, at: DateTime<Utc>) {
        self.consecutive_failures = 0;
        self.last_healthy_at = Some(at);
    }

    /// Record a failed probe, bumping the consecutive-failure counter.
    pub fn mark_failure(&mut self) -> u32 {
        self.consecutive_failures += 1;
        self.consecutive_failures
    }

    /// Bump the injection generation after a (re)injection of the bundle.
    pub fn bump_generation(&mut self) -> u64 {
        self.injection_generation += 1;
        self.injection_generation
    }

    /// Append a restart event, evicting the oldest entry once the ring
    /// buffer is at capacity.
    pub fn push_restart_event(&mut self, event: RestartEvent) {
        if self.restart_history.len() == RESTART_HISTORY_CAPACITY {
            self.restart_history.pop_front();
        }
        self.restart_history.push_back(event);
    }
}
