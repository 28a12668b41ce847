#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # fleet-watchdog — Health Watchdog & State Snapshotter
//!
//! Components D and E of the Browser Fleet Orchestrator (spec.md §2,
//! §4.4, §4.5). Runs off the command path: probes every instance at
//! three tiers, classifies failures, and drives recovery through the
//! [`watchdog::RecoveryHooks`] seam implemented by `fleet-controller`.

pub mod error;
pub mod snapshotter;
pub mod watchdog;

pub use error::WatchdogError;
pub use snapshotter::Snapshotter;
pub use watchdog::{HealthWatchdog, ProbeOutcome, RecoveryHooks};
