//! HTTP handlers for the Intent Router and Dashboard API (spec.md §4.7,
//! §4.8). Each submodule owns one route; [`crate::router`] wires them
//! into an [`axum::Router`].

pub mod dashboard;
pub mod exit;
pub mod trade;
pub mod webhook;
