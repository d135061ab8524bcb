//! cw-reconcile
//!
//! Channel-state reconciliation engine.
//!
//! Architectural decisions:
//! - A channel's first observed status is a baseline, never an alert
//! - Only a status *change* against the previous snapshot produces an event
//! - Channels that stop being reported are dropped silently unless the
//!   disappearance policy says otherwise
//! - The current observation always becomes the next baseline
//!
//! Deterministic, pure logic. No IO. No device or alerting calls.

mod engine;
mod family;
mod types;

pub use engine::{diff, diff_snapshots, diff_with_last_seen};
pub use family::{DeviceFamily, NamingScheme};
pub use types::*;
