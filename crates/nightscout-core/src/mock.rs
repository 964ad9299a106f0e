//! Mock glucose source for testing.
//!
//! [`MockSource`] implements [`GlucoseSource`] so the polling shell can be
//! exercised without a Nightscout server.
//!
//! # Features
//!
//! - **Canned snapshot**: The same snapshot is served on every successful call
//! - **Failure injection**: Queue errors to be returned before the snapshot
//! - **Call counting**: Check how many polls reached the source

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::traits::{GlucoseSource, Snapshot};

/// A mock Nightscout site for testing.
///
/// # Example
///
/// ```
/// use nightscout_core::{GlucoseSource, MockSource, Snapshot};
///
/// #[tokio::main]
/// async fn main() {
///     let source = MockSource::new(Snapshot::default());
///     source.fail_next(nightscout_core::Error::Status(500)).await;
///
///     assert!(source.snapshot().await.is_err());
///     assert!(source.snapshot().await.is_ok());
///     assert_eq!(source.call_count(), 2);
/// }
/// ```
pub struct MockSource {
    base_url: String,
    snapshot: Snapshot,
    failures: Mutex<VecDeque<Error>>,
    calls: AtomicU32,
}

impl MockSource {
    /// Create a mock serving `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            base_url: "http://mock.nightscout.test".to_string(),
            snapshot,
            failures: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    /// Make the next call fail with `error`. Calls queue up in order.
    pub async fn fail_next(&self, error: Error) {
        self.failures.lock().await.push_back(error);
    }

    /// Number of snapshot calls so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GlucoseSource for MockSource {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failures.lock().await.pop_front() {
            return Err(error);
        }
        Ok(self.snapshot.clone())
    }
}
