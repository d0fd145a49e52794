//! HTTP server for the padel bracket engine.
//!
//! The binary wires [`config`], [`logging`] and [`metrics`] around the
//! [`api`] router; the library target exists so the router can be driven
//! directly from integration tests.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
