// ABOUTME: Library root for bridgekeeper - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod controller;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod reconcile;
pub mod runtime;
pub mod types;
