//! Platform-agnostic types for Nightscout glucose data.
//!
//! This crate provides the data model shared by the fetcher, the presenter
//! and the menu-bar shell.
//!
//! # Features
//!
//! - Raw entry and device status records as served by the Nightscout REST API
//! - Trend directions with their arrow glyphs
//! - Glucose unit conversion between mg/dL and mmol/L
//! - Loop freshness classification
//!
//! # Example
//!
//! ```
//! use nightscout_types::{Entry, GlucoseUnit, filter_readings};
//!
//! let entries = vec![Entry {
//!     sgv: Some(120),
//!     date: Some(1_700_000_000_000),
//!     direction: Some("Flat".into()),
//! }];
//! let readings = filter_readings(&entries);
//! assert_eq!(readings[0].arrow(), "→");
//! assert_eq!(GlucoseUnit::MmolL.format_value(readings[0].mgdl), "6.7");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    DeviceStatus, Direction, Entry, GlucoseUnit, LoopStatus, NO_DIRECTION, Reading,
    filter_readings, mgdl_to_mmol, parse_rfc3339_millis, unix_millis,
};
