//! Time-window policy deciding which commit dates are disallowed
//!
//! The default window is Monday to Friday, 09:00 to 18:59 (hours 9 through 18
//! inclusive). Some setups treat 19 as the last working hour, so the upper
//! bound is configurable rather than fixed.

use crate::error::{RetimeError, RetimeResult};
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Serialize};

pub const DEFAULT_START_HOUR: u32 = 9;
pub const DEFAULT_END_HOUR: u32 = 18;

/// Weekdays and inclusive hour range during which commits must not be dated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeWindow {
    /// Days the window applies to
    #[serde(with = "weekday_names")]
    pub weekdays: Vec<Weekday>,
    /// First disallowed hour (inclusive)
    pub start_hour: u32,
    /// Last disallowed hour (inclusive)
    pub end_hour: u32,
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            weekdays: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
        }
    }
}

impl TimeWindow {
    /// Default weekdays with a different last working hour
    pub fn with_end_hour(end_hour: u32) -> Self {
        Self {
            end_hour,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> RetimeResult<()> {
        if self.weekdays.is_empty() {
            return Err(RetimeError::InvalidPolicy(
                "at least one weekday is required".into(),
            ));
        }
        if self.start_hour > 23 || self.end_hour > 23 {
            return Err(RetimeError::InvalidPolicy(format!(
                "hours must be within 0-23 (got {}-{})",
                self.start_hour, self.end_hour
            )));
        }
        if self.start_hour > self.end_hour {
            return Err(RetimeError::InvalidPolicy(format!(
                "start_hour {} is after end_hour {}",
                self.start_hour, self.end_hour
            )));
        }
        Ok(())
    }

    /// Whether `date` falls inside the window, evaluated in its own offset.
    pub fn is_disallowed(&self, date: &DateTime<FixedOffset>) -> bool {
        self.weekdays.contains(&date.weekday())
            && (self.start_hour..=self.end_hour).contains(&date.hour())
    }
}

/// Serialize weekdays as lowercase three-letter names (`mon`, `tue`, ...)
mod weekday_names {
    use chrono::Weekday;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(days: &[Weekday], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(days.iter().map(|d| d.to_string().to_lowercase()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Weekday>, D::Error> {
        let names = Vec::<String>::deserialize(d)?;
        names
            .iter()
            .map(|n| {
                n.parse::<Weekday>()
                    .map_err(|_| D::Error::custom(format!("unknown weekday '{}'", n)))
            })
            .collect()
    }
}
