//! Browser Process Supervisor (spec.md §4.1): owns the OS lifecycle of
//! every managed browser process and enforces the protected-port
//! invariant.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use fleet_core::instance::InstanceRecord;
use fleet_core::AccountName;
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::SupervisorError;
use crate::launch_profile::LaunchProfile;

/// Seam over the OS process table so tests can inject a fake one instead
/// of spawning real browsers (SPEC_FULL §4.1).
#[async_trait::async_trait]
pub trait ProcessInspector: Send + Sync {
    /// Returns `(pid, cmdline)` for every live process on the machine.
    async fn list_processes(&self) -> Vec<(u32, String)>;

    /// Sends a graceful termination signal to `pid`.
    async fn terminate(&self, pid: u32) -> Result<(), std::io::Error>;

    /// Force-kills `pid`. Always succeeds from the caller's perspective —
    /// the final step of termination (spec.md §4.1 failure semantics).
    async fn kill(&self, pid: u32);

    async fn is_alive(&self, pid: u32) -> bool;
}

/// Real `/proc`-backed inspector (Linux deployment target, SPEC_FULL
/// §4.1).
#[derive(Debug, Default)]
pub struct ProcProcessInspector;

#[async_trait::async_trait]
impl ProcessInspector for ProcProcessInspector {
    async fn list_processes(&self) -> Vec<(u32, String)> {
        let mut out = Vec::new();
        let Ok(mut entries) = tokio::fs::read_dir("/proc").await else {
            return out;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
                continue;
            };
            let cmdline_path = entry.path().join("cmdline");
            if let Ok(raw) = tokio::fs::read(&cmdline_path).await {
                let cmdline = String::from_utf8_lossy(&raw).replace('\0', " ");
                out.push((pid, cmdline));
            }
        }
        out
    }

    async fn terminate(&self, pid: u32) -> Result<(), std::io::Error> {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
                .map_err(|e| std::io::Error::other(e.to_string()))
        }
        #[cfg(not(unix))]
        {
            let _ = pid;
            Ok(())
        }
    }

    async fn kill(&self, pid: u32) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGKILL);
        }
        #[cfg(not(unix))]
        {
            let _ = pid;
        }
    }

    async fn is_alive(&self, pid: u32) -> bool {
        tokio::fs::metadata(format!("/proc/{pid}")).await.is_ok()
    }
}

/// Owns the OS lifecycle of every managed browser process.
#[derive(Debug)]
pub struct Supervisor<I: ProcessInspector = ProcProcessInspector> {
    protected_port: u16,
    browser_binary: PathBuf,
    inspector: I,
    startup_timeout: Duration,
}

/// A launched process plus the record describing it; the Supervisor
/// hands this to the caller (typically the Session Adapter's bring-up
/// path) to own for the instance's lifetime.
#[derive(Debug)]
pub struct LaunchedInstance {
    pub record: InstanceRecord,
    pub child: Child,
}

impl<I: ProcessInspector> Supervisor<I> {
    pub fn new(protected_port: u16, browser_binary: impl Into<PathBuf>, inspector: I) -> Self {
        Self {
            protected_port,
            browser_binary: browser_binary.into(),
            inspector,
            startup_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Launches a fresh instance. Precondition: `port > protected_port`
    /// and no other live record holds it — enforced here, not by an
    /// external registry (spec.md §4.1 design rationale), so the
    /// orchestrator stays safe even if its own tracking file is lost.
    pub async fn launch(
        &self,
        account_name: AccountName,
        port: u16,
        existing_ports: &HashSet<u16>,
    ) -> Result<LaunchedInstance, SupervisorError> {
        if port == self.protected_port || port <= self.protected_port {
            return Err(SupervisorError::ProtectedPort { port });
        }
        if existing_ports.contains(&port) {
            return Err(SupervisorError::PortInUse { port });
        }

        let profile_dir = tempfile::Builder::new()
            .prefix(&format!("fleet-{}-", account_name.as_str()))
            .tempdir()
            .map_err(SupervisorError::ProfileDirFailed)?
            .into_path();

        let profile = LaunchProfile::new(&self.browser_binary, port, &profile_dir);
        let child = Command::new(&profile.binary)
            .args(profile.args())
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| SupervisorError::SpawnFailed { account: account_name.clone(), source })?;

        if !self.wait_for_responsive(port).await {
            let mut child = child;
            let _ = child.start_kill();
            let _ = tokio::fs::remove_dir_all(&profile_dir).await;
            return Err(SupervisorError::StartupTimedOut { port, timeout_secs: self.startup_timeout.as_secs() });
        }

        info!(account = %account_name, port, "launched browser instance");
        let record = InstanceRecord::new(account_name, port, profile_dir.display().to_string());
        Ok(LaunchedInstance { record, child })
    }

    async fn wait_for_responsive(&self, port: u16) -> bool {
        let deadline = Instant::now() + self.startup_timeout;
        while Instant::now() < deadline {
            if tokio::net::TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        false
    }

    /// Graceful termination, escalating to force-kill after 10s. Always
    /// removes the profile dir.
    pub async fn terminate(&self, record: &InstanceRecord, pid: u32) {
        let _ = self.inspector.terminate(pid).await;
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if !self.inspector.is_alive(pid).await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        if self.inspector.is_alive(pid).await {
            warn!(pid, "process did not exit gracefully, force-killing");
            self.inspector.kill(pid).await;
        }
        if let Err(err) = tokio::fs::remove_dir_all(&record.profile_dir).await {
            warn!(profile_dir = %record.profile_dir, %err, "failed to remove profile dir");
        }
    }

    /// Returns only PIDs whose command line declares a debug port in the
    /// managed range (strictly above `protected_port`). Processes on the
    /// protected port are never returned (spec.md §4.1, invariant 1 of
    /// §8).
    pub async fn enumerate_managed(&self) -> Vec<u32> {
        let mut out = Vec::new();
        for (pid, cmdline) in self.inspector.list_processes().await {
            if LaunchProfile::declares_port(&cmdline, self.protected_port) {
                continue;
            }
            if cmdline.contains("--remote-debugging-port=") {
                if let Some(port) = parse_debug_port(&cmdline) {
                    if port > self.protected_port {
                        out.push(pid);
                    }
                }
            }
        }
        out
    }
}

fn parse_debug_port(cmdline: &str) -> Option<u16> {
    cmdline
        .split_whitespace()
        .find_map(|token| token.strip_prefix("--remote-debugging-port="))
        .and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeInspector {
        processes: Mutex<Vec<(u32, String)>>,
        terminated: Mutex<Vec<u32>>,
        killed: Mutex<Vec<u32>>,
    }

    #[async_trait::async_trait]
    impl ProcessInspector for FakeInspector {
        async fn list_processes(&self) -> Vec<(u32, String)> {
            self.processes.lock().unwrap().clone()
        }
        async fn terminate(&self, pid: u32) -> Result<(), std::io::Error> {
            self.terminated.lock().unwrap().push(pid);
            Ok(())
        }
        async fn kill(&self, pid: u32) {
            self.killed.lock().unwrap().push(pid);
        }
        async fn is_alive(&self, pid: u32) -> bool {
            !self.terminated.lock().unwrap().contains(&pid)
        }
    }

    #[tokio::test]
    async fn enumerate_managed_never_returns_protected_port() {
        let inspector = FakeInspector {
            processes: Mutex::new(vec![
                (100, "/usr/bin/chromium --remote-debugging-port=9222".to_string()),
                (200, "/usr/bin/chromium --remote-debugging-port=9223".to_string()),
                (300, "/usr/bin/some-other-process".to_string()),
            ]),
            ..Default::default()
        };
        let supervisor = Supervisor::new(9222, "/usr/bin/chromium", inspector);
        let managed = supervisor.enumerate_managed().await;
        assert_eq!(managed, vec![200]);
    }

    #[tokio::test]
    async fn launch_rejects_the_protected_port() {
        let supervisor = Supervisor::new(9222, "/usr/bin/chromium", FakeInspector::default());
        let result = supervisor.launch(AccountName::from("acc0"), 9222, &HashSet::new()).await;
        assert!(matches!(result, Err(SupervisorError::ProtectedPort { port: 9222 })));
    }

    #[tokio::test]
    async fn launch_rejects_an_already_used_port() {
        let supervisor = Supervisor::new(9222, "/usr/bin/chromium", FakeInspector::default());
        let mut existing = HashSet::new();
        existing.insert(9223);
        let result = supervisor.launch(AccountName::from("acc0"), 9223, &existing).await;
        assert!(matches!(result, Err(SupervisorError::PortInUse { port: 9223 })));
    }
}
