//! HTTP client for the Nightscout REST API.
//!
//! The menu bar only needs two read-only endpoints: recent glucose entries
//! and recent device status records. Both are fetched with a short
//! per-request timeout and a bounded number of attempts.
//!
//! # Example
//!
//! ```no_run
//! use nightscout_core::NightscoutClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NightscoutClient::new("https://example.herokuapp.com")?;
//!
//! let snapshot = client.snapshot().await?;
//! println!("{} entries", snapshot.entries.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use nightscout_types::{DeviceStatus, Entry};

use crate::error::{Error, Result};
use crate::presenter::HISTORY_LENGTH;
use crate::retry::{RetryConfig, with_retry};
use crate::traits::{GlucoseSource, Snapshot};

/// Path of the glucose entries endpoint.
pub const SGVS_PATH: &str = "/api/v1/entries/sgv.json";

/// Path of the device status endpoint.
pub const DEVICESTATUS_PATH: &str = "/api/v1/devicestatus/";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Options for building a [`NightscoutClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Skip TLS certificate verification (self-signed hosts).
    pub accept_invalid_certs: bool,
    /// Retry policy applied to each request.
    pub retry: RetryConfig,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: false,
            retry: RetryConfig::for_poll(),
        }
    }
}

/// HTTP client for one Nightscout site.
#[derive(Debug, Clone)]
pub struct NightscoutClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    retry: RetryConfig,
}

impl NightscoutClient {
    /// Create a client with default options.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The site URL (e.g., "https://example.herokuapp.com")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// Create a client with custom options.
    pub fn with_options(base_url: &str, options: ClientOptions) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let client = Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .user_agent(concat!("nightscout-menubar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport {
                url: base_url.clone(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url,
            timeout: options.timeout,
            retry: options.retry,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the entries endpoint asking for `count` records.
    pub fn entries_url(&self, count: usize) -> String {
        format!("{}{}?count={}", self.base_url, SGVS_PATH, count)
    }

    /// URL of the device status endpoint.
    pub fn device_status_url(&self) -> String {
        format!("{}{}", self.base_url, DEVICESTATUS_PATH)
    }

    /// Fetch the latest `count` entries.
    pub async fn entries(&self, count: usize) -> Result<Vec<Entry>> {
        let url = self.entries_url(count);
        with_retry(&self.retry, "entries", || self.get_records(&url)).await
    }

    /// Fetch recent device status records.
    pub async fn device_status(&self) -> Result<Vec<DeviceStatus>> {
        let url = self.device_status_url();
        with_retry(&self.retry, "devicestatus", || self.get_records(&url)).await
    }

    /// Fetch entries (enough for the history plus one) and device status.
    ///
    /// The two requests run concurrently; the snapshot fails if either does.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let (entries, device_status) =
            tokio::try_join!(self.entries(HISTORY_LENGTH + 1), self.device_status())?;
        debug!(
            entries = entries.len(),
            device_status = device_status.len(),
            "Fetched snapshot"
        );
        Ok(Snapshot {
            entries,
            device_status,
        })
    }

    // ======================================================================
    // Internal HTTP helpers
    // ======================================================================

    async fn get_records<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url, e))?;
        parse_records(&body)
    }

    fn request_error(&self, url: &str, source: reqwest::Error) -> Error {
        if source.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
                duration: self.timeout,
            }
        } else {
            Error::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl GlucoseSource for NightscoutClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn snapshot(&self) -> Result<Snapshot> {
        NightscoutClient::snapshot(self).await
    }
}

/// Trim whitespace and trailing slashes and check the scheme.
///
/// An empty host means the user has not configured one yet.
pub fn normalize_base_url(base_url: &str) -> Result<String> {
    let base_url = base_url.trim().trim_end_matches('/');
    if base_url.is_empty() {
        return Err(Error::NotConfigured);
    }

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(Error::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }

    Ok(base_url.to_string())
}

/// Decode a response body that must be a JSON list of objects.
///
/// Only the first element decides whether the body is a list of records.
/// Later elements that do not decode are skipped, so one odd upload cannot
/// hide the rest of the history.
pub fn parse_records<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>> {
    let value: Value = serde_json::from_slice(body).map_err(|_| Error::BadJson)?;
    let items = match value {
        Value::Array(items) if items.first().is_none_or(Value::is_object) => items,
        _ => return Err(Error::BadData),
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if records.len() < total {
        debug!("Skipped {} undecodable records", total - records.len());
    }
    Ok(records)
}
