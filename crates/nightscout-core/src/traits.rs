//! Trait abstraction over where glucose data comes from.
//!
//! This module provides the [`GlucoseSource`] trait that abstracts over the
//! real Nightscout client and the mock source used in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use nightscout_types::{DeviceStatus, Entry};

use crate::error::Result;

/// Everything one poll fetches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Recent entries, newest first.
    pub entries: Vec<Entry>,
    /// Recent device status records, newest first.
    pub device_status: Vec<DeviceStatus>,
}

/// A provider of Nightscout snapshots.
///
/// # Example
///
/// ```ignore
/// use nightscout_core::{GlucoseSource, Presenter};
///
/// async fn title<S: GlucoseSource>(source: &S, presenter: &Presenter) -> String {
///     let snapshot = source.snapshot().await?;
///     presenter.render(&snapshot, time::OffsetDateTime::now_utc())?.title
/// }
/// ```
#[async_trait]
pub trait GlucoseSource: Send + Sync {
    /// The site this source reads from.
    fn base_url(&self) -> &str;

    /// Fetch entries and device status.
    async fn snapshot(&self) -> Result<Snapshot>;
}
