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

//! # fleet-browser — Browser Process Supervisor & Debug-Protocol Client
//!
//! Components A and B of the Browser Fleet Orchestrator (spec.md §2,
//! §4.1, §4.2). [`supervisor`] owns the OS lifecycle of every managed
//! browser process and enforces the protected-port invariant. [`debug`]
//! is a thin wrapper over the Chrome DevTools Protocol, specialized to
//! the four operations this system needs.

pub mod debug;
pub mod error;
pub mod launch_profile;
pub mod supervisor;

pub use debug::{CdpDebugTransport, ConsoleEvent, DebugSessionHandle, DebugTransport};
pub use error::{DebugError, SupervisorError};
pub use launch_profile::LaunchProfile;
pub use supervisor::{ProcProcessInspector, ProcessInspector, Supervisor};
