//! cw-source
//!
//! Where channel statuses come from.
//!
//! This crate defines the [`ChannelStatusSource`] boundary, the wire-level
//! shapes each device family answers with, and one HTTP implementation that
//! polls every configured device of a family.

mod error;
mod http;
pub mod wire;

use std::collections::BTreeMap;

use async_trait::async_trait;
use cw_reconcile::{ChannelStatus, DeviceFamily};

pub use error::FetchError;
pub use http::{DeviceTarget, HttpChannelSource};

/// Per-device fetch results, keyed by device address.
///
/// A device that could not be read is an `Err` entry, not a missing one, so
/// the caller can tell "unreachable" from "not configured".
pub type FetchOutcome = BTreeMap<String, Result<Vec<ChannelStatus>, FetchError>>;

/// Fetches the current status of every monitored channel of one family.
#[async_trait]
pub trait ChannelStatusSource: Send + Sync {
    fn family(&self) -> DeviceFamily;

    /// `Err` means nothing at all could be fetched for the family.
    async fn fetch(&self) -> Result<FetchOutcome, FetchError>;
}
