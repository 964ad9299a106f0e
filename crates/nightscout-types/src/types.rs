//! Core types for Nightscout glucose data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{ParseError, ParseResult};

/// Divisor converting mg/dL to mmol/L.
pub const MGDL_PER_MMOL: f64 = 18.018;

/// Arrow shown when an entry has no (or an unrecognized) trend direction.
pub const NO_DIRECTION: &str = "-";

/// Device status younger than this (in seconds) counts as fresh.
pub const LOOP_FRESH_SECS: i64 = 300;

/// Device status older than this (in seconds) counts as stale.
pub const LOOP_STALE_SECS: i64 = 1200;

/// Trend direction reported alongside a glucose sample.
///
/// The variant names match the strings Nightscout uses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    DoubleUp,
    SingleUp,
    FortyFiveUp,
    Flat,
    FortyFiveDown,
    SingleDown,
    DoubleDown,
}

impl Direction {
    /// Look up a direction by its Nightscout name.
    ///
    /// Names such as `"NONE"` or `"NOT COMPUTABLE"` yield `None`.
    ///
    /// ```
    /// use nightscout_types::Direction;
    ///
    /// assert_eq!(Direction::from_name("FortyFiveUp"), Some(Direction::FortyFiveUp));
    /// assert_eq!(Direction::from_name("NOT COMPUTABLE"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "DoubleUp" => Some(Direction::DoubleUp),
            "SingleUp" => Some(Direction::SingleUp),
            "FortyFiveUp" => Some(Direction::FortyFiveUp),
            "Flat" => Some(Direction::Flat),
            "FortyFiveDown" => Some(Direction::FortyFiveDown),
            "SingleDown" => Some(Direction::SingleDown),
            "DoubleDown" => Some(Direction::DoubleDown),
            _ => None,
        }
    }

    /// The arrow glyph used in the menu bar.
    #[must_use]
    pub fn arrow(&self) -> &'static str {
        match self {
            Direction::DoubleUp => "⇈",
            Direction::SingleUp => "↑",
            Direction::FortyFiveUp => "↗",
            Direction::Flat => "→",
            Direction::FortyFiveDown => "↘",
            Direction::SingleDown => "↓",
            Direction::DoubleDown => "⇊",
        }
    }
}

/// Unit used to display glucose values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GlucoseUnit {
    /// Milligrams per decilitre, shown as integers.
    #[default]
    MgDl,
    /// Millimoles per litre, shown with one decimal.
    MmolL,
}

impl GlucoseUnit {
    /// Map the persisted `use_mmol` flag to a unit.
    #[must_use]
    pub fn from_mmol_flag(use_mmol: bool) -> Self {
        if use_mmol {
            GlucoseUnit::MmolL
        } else {
            GlucoseUnit::MgDl
        }
    }

    /// Whether this unit is mmol/L.
    #[must_use]
    pub fn is_mmol(&self) -> bool {
        matches!(self, GlucoseUnit::MmolL)
    }

    /// Menu label for the unit.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }

    /// Format a mg/dL quantity in this unit.
    ///
    /// ```
    /// use nightscout_types::GlucoseUnit;
    ///
    /// assert_eq!(GlucoseUnit::MgDl.format_value(120), "120");
    /// assert_eq!(GlucoseUnit::MmolL.format_value(120), "6.7");
    /// ```
    #[must_use]
    pub fn format_value(&self, mgdl: i32) -> String {
        match self {
            GlucoseUnit::MgDl => mgdl.to_string(),
            GlucoseUnit::MmolL => format!("{:.1}", mgdl_to_mmol(mgdl)),
        }
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Convert mg/dL to mmol/L, rounded to one decimal.
#[must_use]
pub fn mgdl_to_mmol(mgdl: i32) -> f64 {
    (f64::from(mgdl) / MGDL_PER_MMOL * 10.0).round() / 10.0
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn unix_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Parse an RFC 3339 timestamp into epoch milliseconds.
pub fn parse_rfc3339_millis(s: &str) -> ParseResult<i64> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map(unix_millis)
        .map_err(|e| ParseError::InvalidTimestamp(format!("{s}: {e}")))
}

/// One raw record from `/api/v1/entries/sgv.json`.
///
/// Only the fields the menu bar needs are modelled, and all of them are
/// parsed leniently. Uploaders send `sgv` and `date` as numbers or numeric
/// strings depending on the source; a field of any other shape reads as
/// absent.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry {
    /// Sensor glucose value in mg/dL. Absent for calibration or meter entries.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::option_i32")
    )]
    pub sgv: Option<i32>,
    /// Epoch milliseconds.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::option_i64")
    )]
    pub date: Option<i64>,
    /// Trend direction name.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::option_string")
    )]
    pub direction: Option<String>,
}

/// A glucose sample extracted from an [`Entry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Glucose in mg/dL.
    pub mgdl: i32,
    /// Epoch milliseconds.
    pub date: i64,
    /// Trend direction, if recognized.
    pub direction: Option<Direction>,
}

impl Reading {
    /// Build a reading from an entry carrying both `sgv` and `date`.
    #[must_use]
    pub fn from_entry(entry: &Entry) -> Option<Self> {
        Some(Self {
            mgdl: entry.sgv?,
            date: entry.date?,
            direction: entry.direction.as_deref().and_then(Direction::from_name),
        })
    }

    /// Arrow glyph for the reading's trend.
    #[must_use]
    pub fn arrow(&self) -> &'static str {
        self.direction.map_or(NO_DIRECTION, |d| d.arrow())
    }

    /// Whole seconds elapsed between the reading and `now`.
    #[must_use]
    pub fn seconds_ago(&self, now: OffsetDateTime) -> i64 {
        unix_millis(now).saturating_sub(self.date) / 1000
    }
}

/// Keep the entries that carry a glucose value, newest first as received.
#[must_use]
pub fn filter_readings(entries: &[Entry]) -> Vec<Reading> {
    entries.iter().filter_map(Reading::from_entry).collect()
}

/// One record from `/api/v1/devicestatus/`.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceStatus {
    /// Uploading device, e.g. `"loop://iPhone"`.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::option_string")
    )]
    pub device: Option<String>,
    /// RFC 3339 creation time.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::option_string")
    )]
    pub created_at: Option<String>,
    /// Epoch milliseconds, present on records served through the socket API.
    #[cfg_attr(
        feature = "serde",
        serde(default, deserialize_with = "lenient::option_i64")
    )]
    pub mills: Option<i64>,
}

impl DeviceStatus {
    /// When the status was reported, in epoch milliseconds.
    ///
    /// Prefers `mills` and falls back to parsing `created_at`.
    #[must_use]
    pub fn reported_at_millis(&self) -> Option<i64> {
        self.mills.or_else(|| {
            self.created_at
                .as_deref()
                .and_then(|s| parse_rfc3339_millis(s).ok())
        })
    }
}

/// Freshness of the closed-loop system, shown in front of the glucose value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LoopStatus {
    /// Reported within the last five minutes.
    Fresh,
    /// Reported a while ago, or the age is unknown.
    Warning,
    /// Not reported for over twenty minutes.
    Stale,
}

impl LoopStatus {
    /// Classify a device status age in seconds.
    ///
    /// ```
    /// use nightscout_types::LoopStatus;
    ///
    /// assert_eq!(LoopStatus::from_age_secs(Some(60)), LoopStatus::Fresh);
    /// assert_eq!(LoopStatus::from_age_secs(Some(600)), LoopStatus::Warning);
    /// assert_eq!(LoopStatus::from_age_secs(Some(1800)), LoopStatus::Stale);
    /// assert_eq!(LoopStatus::from_age_secs(None), LoopStatus::Warning);
    /// ```
    #[must_use]
    pub fn from_age_secs(age: Option<i64>) -> Self {
        match age {
            Some(secs) if secs < LOOP_FRESH_SECS => LoopStatus::Fresh,
            Some(secs) if secs > LOOP_STALE_SECS => LoopStatus::Stale,
            _ => LoopStatus::Warning,
        }
    }

    /// Glyph shown in the menu bar.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            LoopStatus::Fresh => "↻",
            LoopStatus::Warning => "⚠",
            LoopStatus::Stale => "⚡",
        }
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(feature = "serde")]
mod lenient {
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(i64),
        Float(f64),
        Text(String),
        Other(IgnoredAny),
    }

    impl Number {
        fn into_i64(self) -> Option<i64> {
            match self {
                Number::Int(n) => Some(n),
                Number::Float(f) => finite_trunc(f),
                Number::Text(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(finite_trunc))
                }
                Number::Other(_) => None,
            }
        }
    }

    fn finite_trunc(f: f64) -> Option<i64> {
        f.is_finite().then(|| f.trunc() as i64)
    }

    pub(super) fn option_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(Number::deserialize(d)?.into_i64())
    }

    pub(super) fn option_i32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i32>, D::Error> {
        Ok(option_i64(d)?.and_then(|n| i32::try_from(n).ok()))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Text {
        Str(String),
        Other(IgnoredAny),
    }

    pub(super) fn option_string<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(match Text::deserialize(d)? {
            Text::Str(s) => Some(s),
            Text::Other(_) => None,
        })
    }
}
