//! The fixed browser argument set, declared once as data rather than a
//! hardcoded argument vector (SPEC_FULL §4.1), so it is unit-testable
//! without spawning a real process.

use std::path::PathBuf;

/// Assembled from `trading_defaults` + per-account `credentials` config;
/// the only thing `Supervisor::launch` needs to know to build a command
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchProfile {
    pub binary: PathBuf,
    pub port: u16,
    pub profile_dir: PathBuf,
    pub extra_args: Vec<String>,
}

impl LaunchProfile {
    pub fn new(binary: impl Into<PathBuf>, port: u16, profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            port,
            profile_dir: profile_dir.into(),
            extra_args: Vec::new(),
        }
    }

    /// Renders the fixed argument set (spec.md §4.1): remote debugging
    /// enabled on `port`, background throttling disabled, no first-run
    /// dialogs, a dedicated profile directory.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--remote-debugging-port={}", self.port),
            format!("--user-data-dir={}", self.profile_dir.display()),
            "--no-first-run".to_string(),
            "--disable-background-timer-throttling".to_string(),
            "--disable-backgrounding-occluded-windows".to_string(),
            "--disable-renderer-backgrounding".to_string(),
            "--no-default-browser-check".to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Declares the debug port in a form recoverable from `/proc/<pid>/cmdline`
    /// by [`crate::supervisor::ProcessInspector`].
    pub fn declares_port(cmdline: &str, port: u16) -> bool {
        cmdline.contains(&format!("--remote-debugging-port={port}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_declare_the_requested_port() {
        let profile = LaunchProfile::new("/usr/bin/chromium", 9223, "/tmp/profile-acc0");
        let args = profile.args();
        assert!(args.contains(&"--remote-debugging-port=9223".to_string()));
    }

    #[test]
    fn declares_port_matches_only_exact_port() {
        let cmdline = "/usr/bin/chromium --remote-debugging-port=9223 --user-data-dir=/tmp/x";
        assert!(LaunchProfile::declares_port(cmdline, 9223));
        assert!(!LaunchProfile::declares_port(cmdline, 9222));
    }
}
