//! Error types for nightscout-core.
//!
//! Messages for HTTP status and payload problems match what the menu shows
//! the user, so they are kept short.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching or presenting Nightscout data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No Nightscout host has been configured yet.
    #[error("No Nightscout URL configured")]
    NotConfigured,

    /// The configured host is not a usable URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The request did not complete within the configured timeout.
    #[error("Timed out after {duration:?} requesting {url}")]
    Timeout { url: String, duration: Duration },

    /// The request could not be sent or its body could not be read.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with something other than 200 OK.
    #[error("Nightscout returned status {0}")]
    Status(u16),

    /// The body was JSON but not a list of records.
    #[error("Nightscout returned bad data")]
    BadData,

    /// The body was not JSON.
    #[error("Nightscout returned bad JSON")]
    BadJson,

    /// The response contained no glucose readings to display.
    #[error("No glucose readings available")]
    NoReadings,
}

/// Result type alias using nightscout-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        assert_eq!(
            Error::Status(502).to_string(),
            "Nightscout returned status 502"
        );
    }

    #[test]
    fn test_payload_messages() {
        assert_eq!(Error::BadData.to_string(), "Nightscout returned bad data");
        assert_eq!(Error::BadJson.to_string(), "Nightscout returned bad JSON");
    }

    #[test]
    fn test_timeout_message_names_url() {
        let err = Error::Timeout {
            url: "https://example.test/api/v1/devicestatus/".into(),
            duration: Duration::from_secs(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("2s"));
        assert!(msg.contains("devicestatus"));
    }
}
