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

//! # fleet-adapter — the Session Adapter (spec.md §4.3)
//!
//! Presents one browser instance as a single object whose methods
//! correspond to trading intents, hiding tab resolution, injection, and
//! result extraction behind the Verified/Rejected/Error/Timeout taxonomy
//! defined in `fleet_core::command`.

pub mod adapter;
pub mod bundle;
pub mod error;

pub use adapter::{AdapterState, SessionAdapter};
pub use error::AdapterError;
