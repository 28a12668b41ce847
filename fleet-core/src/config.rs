//! The `fleet.toml` schema (spec.md §6, SPEC_FULL §2).
//!
//! `protected_port` is validated once at startup and never reloaded.
//! `routing` and `trading_defaults` are hot-reloadable: re-read on
//! `SIGHUP` or an explicit `GET /api/reload` (SPEC_FULL §6), without
//! restarting any instance.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::{AccountName, StrategyName};
use crate::routing::RoutingTable;

/// Root configuration, deserialized from `fleet.toml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FleetConfig {
    /// Fixed at startup; hard fail if any managed port equals it.
    pub protected_port: u16,
    pub managed_port_base: u16,
    pub max_instances: u16,
    /// Root directory persisted state (`recovery/`, `logs/`) is resolved
    /// relative to (SPEC_FULL §6). Defaults to `./var`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub credentials: HashMap<String, CredentialConfig>,
    pub routing: RoutingConfig,
    pub trading_defaults: TradingDefaults,
    pub watchdog: WatchdogConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// URL host substring identifying the target tab among an instance's
    /// open tabs (spec.md §4.3 tab resolution).
    pub trading_host: String,
    /// Path to the browser binary the Supervisor spawns (spec.md §4.1).
    #[serde(default = "default_browser_binary")]
    pub browser_binary: String,
}

fn default_data_dir() -> String {
    "./var".to_string()
}

fn default_browser_binary() -> String {
    "/usr/bin/chromium".to_string()
}

impl FleetConfig {
    /// Startup validation per spec.md §6/§7 `ConfigInvalid`: the protected
    /// port invariant and port uniqueness across any statically
    /// pre-declared accounts.
    pub fn validate(&self) -> Result<(), String> {
        if self.managed_port_base <= self.protected_port {
            return Err(format!(
                "managed_port_base ({}) must be strictly greater than protected_port ({})",
                self.managed_port_base, self.protected_port
            ));
        }
        self.routing.as_table().validate()?;
        Ok(())
    }
}

/// Opaque to the core; the session adapter interprets these to drive the
/// login sequence (spec.md §1 — out of scope here).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialConfig {
    pub username: String,
    pub password: String,
}

/// Strategy → accounts routing table as declared in TOML.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(flatten)]
    pub strategies: IndexMap<String, Vec<String>>,
}

impl RoutingConfig {
    pub fn as_table(&self) -> RoutingTable {
        let mut entries = IndexMap::new();
        for (strategy, accounts) in &self.strategies {
            entries.insert(
                StrategyName::from(strategy.as_str()),
                accounts.iter().map(|a| AccountName::from(a.as_str())).collect(),
            );
        }
        RoutingTable::new(entries)
    }
}

/// Default trading parameters applied when an inbound intent omits an
/// optional field (spec.md §6, SPEC_FULL §4.7).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingDefaults {
    pub quantity: u64,
    pub tp_ticks: u32,
    pub sl_ticks: u32,
    pub rr_ratio: f64,
    #[serde(default)]
    pub tick_overrides: HashMap<String, f64>,
}

impl TradingDefaults {
    /// Resolves the effective tick size for a symbol: a per-symbol
    /// override if one is configured, else a fixed fallback.
    pub fn tick_size_for(&self, symbol: &str) -> f64 {
        self.tick_overrides.get(symbol).copied().unwrap_or(0.25)
    }
}

/// Watchdog cadence and recovery-budget configuration (spec.md §4.4, §6).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchdogConfig {
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    #[serde(default = "default_confirm_count")]
    pub confirm_count: u32,
    #[serde(default = "default_recovery_budget_secs")]
    pub recovery_budget_secs: u64,
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

fn default_probe_interval_secs() -> u64 {
    10
}
fn default_confirm_count() -> u32 {
    3
}
fn default_recovery_budget_secs() -> u64 {
    300
}
fn default_max_restarts() -> u32 {
    5
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            probe_interval_secs: default_probe_interval_secs(),
            confirm_count: default_confirm_count(),
            recovery_budget_secs: default_recovery_budget_secs(),
            max_restarts: default_max_restarts(),
        }
    }
}

/// HTTP server bind configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_managed_base_at_or_below_protected() {
        let mut config = sample_config();
        config.managed_port_base = config.protected_port;
        assert!(config.validate().is_err());
    }

    #[test]
    fn accepts_well_formed_config() {
        let config = sample_config();
        assert!(config.validate().is_ok());
    }

    fn sample_config() -> FleetConfig {
        let mut strategies = IndexMap::new();
        strategies.insert("DEFAULT".to_string(), vec!["acc0".to_string()]);
        FleetConfig {
            protected_port: 9222,
            managed_port_base: 9223,
            max_instances: 8,
            data_dir: "./var".to_string(),
            credentials: HashMap::new(),
            routing: RoutingConfig { strategies },
            trading_defaults: TradingDefaults {
                quantity: 1,
                tp_ticks: 40,
                sl_ticks: 20,
                rr_ratio: 2.0,
                tick_overrides: HashMap::new(),
            },
            watchdog: WatchdogConfig::default(),
            http: HttpConfig::default(),
            trading_host: "trade.example.com".to_string(),
            browser_binary: "/usr/bin/chromium".to_string(),
        }
    }
}
