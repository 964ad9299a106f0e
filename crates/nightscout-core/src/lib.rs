//! Polling client and menu presenter for Nightscout sites.
//!
//! This crate fetches recent glucose entries and device status records from
//! a Nightscout site and turns them into the short strings shown in a
//! desktop menu bar.
//!
//! # Features
//!
//! - **Fetching**: Two read-only REST calls per poll, each with a short
//!   timeout and a bounded number of attempts
//! - **Presentation**: Trend arrows, deltas, elapsed time and mg/dL to
//!   mmol/L conversion
//! - **Testing**: [`GlucoseSource`] abstracts the site so [`MockSource`] can
//!   stand in for it
//!
//! # Quick Start
//!
//! ```no_run
//! use nightscout_core::{NightscoutClient, Presenter};
//! use nightscout_types::GlucoseUnit;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NightscoutClient::new("https://example.herokuapp.com")?;
//!     let snapshot = client.snapshot().await?;
//!
//!     let view = Presenter::new(GlucoseUnit::MmolL)
//!         .render(&snapshot, time::OffsetDateTime::now_utc())?;
//!     println!("{}", view.title);
//!     for item in view.items {
//!         println!("  {item}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod mock;
pub mod presenter;
pub mod retry;
pub mod traits;

pub use nightscout_types as types;

pub use client::{ClientOptions, NightscoutClient};
pub use error::{Error, Result};
pub use mock::MockSource;
pub use presenter::{MenuView, Presenter};
pub use retry::{RetryConfig, with_retry};
pub use traits::{GlucoseSource, Snapshot};
