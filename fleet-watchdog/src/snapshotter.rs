//! State Snapshotter (spec.md §4.5): captures observable session state
//! before a restart, persists it atomically, and restores it afterward.

use std::path::{Path, PathBuf};

use fleet_core::snapshot::SnapshotRecord;
use fleet_core::AccountName;
use tracing::warn;

use crate::error::WatchdogError;

/// Writes and reads `recovery/<account>.state.json` (spec.md §6).
#[derive(Debug, Clone)]
pub struct Snapshotter {
    recovery_dir: PathBuf,
}

impl Snapshotter {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self { recovery_dir: data_dir.as_ref().join("recovery") }
    }

    fn path_for(&self, account: &AccountName) -> PathBuf {
        self.recovery_dir.join(format!("{}.state.json", account.as_str()))
    }

    /// Persists `snapshot` via write-to-temp-then-rename in the same
    /// directory — atomic on POSIX filesystems (SPEC_FULL §4.5).
    pub async fn capture(&self, snapshot: &SnapshotRecord) -> Result<(), WatchdogError> {
        tokio::fs::create_dir_all(&self.recovery_dir).await.map_err(|e| WatchdogError::SnapshotWriteFailed {
            account: snapshot.account_name.clone(),
            reason: e.to_string(),
        })?;

        let final_path = self.path_for(&snapshot.account_name);
        let tmp_path = self.recovery_dir.join(format!("{}.state.json.tmp", snapshot.account_name.as_str()));

        let body = serde_json::to_vec_pretty(snapshot).map_err(|e| WatchdogError::SnapshotWriteFailed {
            account: snapshot.account_name.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::write(&tmp_path, body).await.map_err(|e| WatchdogError::SnapshotWriteFailed {
            account: snapshot.account_name.clone(),
            reason: e.to_string(),
        })?;
        tokio::fs::rename(&tmp_path, &final_path).await.map_err(|e| WatchdogError::SnapshotWriteFailed {
            account: snapshot.account_name.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Reads back the most recent snapshot for `account`. A snapshot file
    /// that fails to deserialize (corrupt from a prior crash mid-write) is
    /// treated as "no snapshot available" and logged as a warning rather
    /// than aborting recovery (SPEC_FULL §4.5).
    pub async fn read(&self, account: &AccountName) -> Option<SnapshotRecord> {
        let path = self.path_for(account);
        let bytes = tokio::fs::read(&path).await.ok()?;
        match serde_json::from_slice::<SnapshotRecord>(&bytes) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(account = %account, %err, "snapshot file is corrupt, proceeding without restoring state");
                None
            }
        }
    }

    /// Snapshots are discarded on success or on `Failed` (spec.md §3
    /// lifecycle).
    pub async fn discard(&self, account: &AccountName) {
        let _ = tokio::fs::remove_file(self.path_for(account)).await;
    }
}
