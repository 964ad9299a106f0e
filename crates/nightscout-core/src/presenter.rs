//! Derivation of menu text from a Nightscout snapshot.
//!
//! The menu-bar title looks like `↻ 123→ +2 [4m]`: loop freshness, the
//! current value in the chosen unit, its trend arrow, the change since the
//! previous reading and how long ago it was taken. History items repeat the
//! same layout without the loop symbol.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use nightscout_types::{
    DeviceStatus, GlucoseUnit, LoopStatus, Reading, filter_readings, unix_millis,
};

use crate::error::{Error, Result};
use crate::traits::Snapshot;

/// Number of older readings listed under the title.
pub const HISTORY_LENGTH: usize = 5;

/// Readings further apart than this get no delta in the title.
pub const MAX_SECONDS_TO_SHOW_DELTA: i64 = 600;

/// Shown instead of a delta that cannot be computed.
pub const UNKNOWN_DELTA: &str = "?";

/// Title before the first poll completes.
pub const CONNECTING_TITLE: &str = "<Connecting to Nightscout...>";

/// Title when no host is configured.
pub const NEED_SETTINGS_TITLE: &str = "<Need settings>";

/// Title when fetching failed.
pub const FETCH_ERROR_TITLE: &str = "<?>";

/// Title when the fetched data could not be displayed.
pub const DISPLAY_ERROR_TITLE: &str = "<!>";

/// Error messages shown as menu items are cut to this many characters.
pub const MAX_ERROR_ITEM_CHARS: usize = 100;

/// What the menu bar should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuView {
    /// Menu-bar title.
    pub title: String,
    /// Lines listed at the top of the menu.
    pub items: Vec<String>,
}

impl MenuView {
    /// View shown at startup.
    pub fn connecting() -> Self {
        Self {
            title: CONNECTING_TITLE.to_string(),
            items: vec!["connecting...".to_string()],
        }
    }

    /// View shown while no host is configured.
    pub fn need_settings() -> Self {
        Self {
            title: NEED_SETTINGS_TITLE.to_string(),
            items: Vec::new(),
        }
    }

    /// View shown when a fetch failed.
    pub fn fetch_error(error: &Error) -> Self {
        Self {
            title: FETCH_ERROR_TITLE.to_string(),
            items: vec![truncate_chars(&error.to_string(), MAX_ERROR_ITEM_CHARS)],
        }
    }

    /// View shown when a fetched snapshot could not be presented.
    pub fn display_error(error: &Error) -> Self {
        Self {
            title: DISPLAY_ERROR_TITLE.to_string(),
            items: vec![truncate_chars(&format!("{error:?}"), MAX_ERROR_ITEM_CHARS)],
        }
    }

    /// Whether this view reports a problem rather than a reading.
    pub fn is_error(&self) -> bool {
        matches!(
            self.title.as_str(),
            NEED_SETTINGS_TITLE | FETCH_ERROR_TITLE | DISPLAY_ERROR_TITLE
        )
    }
}

/// Formats readings in a glucose unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Presenter {
    unit: GlucoseUnit,
}

impl Presenter {
    /// Create a presenter for the given unit.
    pub fn new(unit: GlucoseUnit) -> Self {
        Self { unit }
    }

    /// The display unit.
    pub fn unit(&self) -> GlucoseUnit {
        self.unit
    }

    /// Build the full menu view for a snapshot.
    pub fn render(&self, snapshot: &Snapshot, now: OffsetDateTime) -> Result<MenuView> {
        let readings = filter_readings(&snapshot.entries);
        let title = self.menubar_text(&readings, &snapshot.device_status, now)?;
        let items = self.history_items(&readings, now);
        Ok(MenuView { title, items })
    }

    /// Title text for the newest reading.
    ///
    /// Fails with [`Error::NoReadings`] when there is nothing to show.
    pub fn menubar_text(
        &self,
        readings: &[Reading],
        device_status: &[DeviceStatus],
        now: OffsetDateTime,
    ) -> Result<String> {
        let last = readings.first().ok_or(Error::NoReadings)?;
        let delta = match readings.get(1) {
            Some(previous)
                if last.date.saturating_sub(previous.date) <= MAX_SECONDS_TO_SHOW_DELTA * 1000 =>
            {
                self.delta(last, previous)
            }
            _ => UNKNOWN_DELTA.to_string(),
        };

        Ok(format!(
            "{} {}{} {} [{}]",
            loop_status(device_status, now).symbol(),
            self.unit.format_value(last.mgdl),
            last.arrow(),
            delta,
            time_ago(last.seconds_ago(now)),
        ))
    }

    /// Menu lines for the readings after the newest one.
    ///
    /// Each line carries the delta against the next older reading, or `?`
    /// for the oldest one fetched.
    pub fn history_items(&self, readings: &[Reading], now: OffsetDateTime) -> Vec<String> {
        readings
            .iter()
            .enumerate()
            .skip(1)
            .take(HISTORY_LENGTH)
            .map(|(i, reading)| {
                let delta = readings
                    .get(i + 1)
                    .map_or_else(|| UNKNOWN_DELTA.to_string(), |older| self.delta(reading, older));
                format!(
                    "{}{} {} [{}]",
                    self.unit.format_value(reading.mgdl),
                    reading.arrow(),
                    delta,
                    time_ago(reading.seconds_ago(now)),
                )
            })
            .collect()
    }

    /// Signed change from `previous` to `last` in the display unit.
    ///
    /// Uses `+` for zero or rising and U+2212 for falling.
    pub fn delta(&self, last: &Reading, previous: &Reading) -> String {
        let diff = last.mgdl.saturating_sub(previous.mgdl);
        let sign = if diff >= 0 { '+' } else { '\u{2212}' };
        let magnitude = match self.unit {
            GlucoseUnit::MgDl => diff.unsigned_abs().to_string(),
            GlucoseUnit::MmolL => {
                format!("{:.1}", nightscout_types::mgdl_to_mmol(diff).abs())
            }
        };
        format!("{sign}{magnitude}")
    }
}

/// Compact elapsed time: minutes below an hour, hours with one decimal above.
///
/// ```
/// use nightscout_core::presenter::time_ago;
///
/// assert_eq!(time_ago(59), "0m");
/// assert_eq!(time_ago(420), "7m");
/// assert_eq!(time_ago(5400), "1.5h");
/// ```
pub fn time_ago(seconds: i64) -> String {
    if seconds >= 3600 {
        format!("{:.1}h", seconds as f64 / 3600.0)
    } else {
        format!("{}m", seconds / 60)
    }
}

/// Loop freshness from the most recently reported device status.
pub fn loop_status(device_status: &[DeviceStatus], now: OffsetDateTime) -> LoopStatus {
    let age = device_status
        .iter()
        .filter_map(DeviceStatus::reported_at_millis)
        .max()
        .map(|reported| unix_millis(now).saturating_sub(reported) / 1000);
    LoopStatus::from_age_secs(age)
}

/// Cut a string to at most `max` characters.
fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
