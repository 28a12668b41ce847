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

//! # fleet-controller — Fleet Controller (spec.md §4.6)
//!
//! Owns the collection of Session Adapters, exposes typed "run on one" /
//! "run on all" fan-out, and aggregates results. [`recovery`] wires the
//! controller's instance table to the Health Watchdog's recovery seam.

pub mod controller;
pub mod error;
pub mod recovery;

pub use controller::{FleetController, InstanceView};
pub use error::ControllerError;
pub use recovery::ControllerRecoveryHooks;
