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

//! # 🛩️ fleet-core — shared types for the Browser Fleet Orchestrator
//!
//! This crate has no knowledge of browsers, debug protocols, or HTTP. It
//! defines the vocabulary every other crate in the workspace shares:
//!
//! - [`instance`]: the per-instance record and its lifecycle state machine.
//! - [`command`]: the command/result taxonomy the Session Adapter's public
//!   API is built from ([`command::CommandOutcome`] is the
//!   Verified/Rejected/Error/Timeout result every method returns).
//! - [`routing`]: the strategy → accounts routing table.
//! - [`snapshot`]: the pre-restart state snapshot record.
//! - [`error`]: the [`FleetError`](error::FleetError) aggregate every
//!   crate's own error type converts into.
//! - [`shutdown`]: the cooperative shutdown signal shared by every task.
//! - [`logging`]: `tracing` initialisers (human-readable and JSON).
//! - [`config`]: the `fleet.toml` schema, including which fields are
//!   hot-reloadable.

pub mod command;
pub mod config;
pub mod error;
pub mod id;
pub mod instance;
pub mod logging;
pub mod routing;
pub mod shutdown;
pub mod snapshot;

pub use command::{CommandOutcome, CommandRecord};
pub use error::FleetError;
pub use id::{AccountName, CommandId, StrategyName};
pub use instance::{InstanceRecord, InstanceState};
pub use routing::RoutingTable;
pub use shutdown::Shutdown;
pub use snapshot::SnapshotRecord;
