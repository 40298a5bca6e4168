//! Integration test utilities for the WebSocket hub
//!
//! This crate provides helpers for running end-to-end tests against a
//! real server bound to a loopback port.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
