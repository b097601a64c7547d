//! When a scene is allowed to run: effect window and repeat days.

use std::fmt;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Time-of-day window during which a scene is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimePeriod {
    #[default]
    AllDay,
    /// `start` is inclusive, `end` exclusive. When `end < start` the window
    /// wraps past midnight (e.g. 22:00 → 06:00).
    Custom { start: NaiveTime, end: NaiveTime },
}

impl TimePeriod {
    /// Whether `time` falls inside the window.
    #[must_use]
    pub fn contains(&self, time: NaiveTime) -> bool {
        match *self {
            Self::AllDay => true,
            Self::Custom { start, end } if start <= end => time >= start && time < end,
            Self::Custom { start, end } => time >= start || time < end,
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyEffectWindow`] for a custom window
    /// whose start equals its end.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Custom { start, end } if start == end => Err(ValidationError::EmptyEffectWindow),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllDay => f.write_str("all_day"),
            Self::Custom { start, end } => {
                write!(f, "{}..{}", start.format("%H:%M"), end.format("%H:%M"))
            }
        }
    }
}

/// How the repeat days of a scene were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatType {
    #[default]
    Daily,
    Workdays,
    Custom,
}

impl RepeatType {
    /// Check that `days` agrees with this repeat type.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::RepeatTypeMismatch`] when a daily scene does
    /// not list every weekday, or a workday scene does not list exactly
    /// Monday to Friday.
    pub fn check(self, days: &RepeatDays) -> Result<(), ValidationError> {
        let expected = match self {
            Self::Daily => RepeatDays::EVERY_DAY,
            Self::Workdays => RepeatDays::WORKDAYS,
            Self::Custom => return Ok(()),
        };
        if days.mask == RepeatDays::mask_of(expected) {
            Ok(())
        } else {
            Err(ValidationError::RepeatTypeMismatch {
                repeat_type: self.to_string(),
                days: days.to_string(),
            })
        }
    }

    /// Days implied by this repeat type. `None` for custom.
    #[must_use]
    pub fn default_days(self) -> Option<RepeatDays> {
        match self {
            Self::Daily => Some(RepeatDays::every_day()),
            Self::Workdays => Some(RepeatDays::workdays()),
            Self::Custom => None,
        }
    }
}

impl fmt::Display for RepeatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => f.write_str("daily"),
            Self::Workdays => f.write_str("workdays"),
            Self::Custom => f.write_str("custom"),
        }
    }
}

/// Set of ISO weekdays (1 = Monday … 7 = Sunday), written as a digit string
/// such as `"135"`. Each digit appears at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepeatDays {
    mask: u8,
}

impl RepeatDays {
    const EVERY_DAY: &'static str = "1234567";
    const WORKDAYS: &'static str = "12345";

    /// Parse a weekday digit string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRepeatDays`] when the string is
    /// empty, contains anything but the digits 1–7, or repeats a digit.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidRepeatDays(value.to_string());
        if value.is_empty() {
            return Err(invalid());
        }
        let mut mask = 0u8;
        for c in value.chars() {
            let day = c.to_digit(10).filter(|d| (1..=7).contains(d)).ok_or_else(invalid)?;
            let bit = 1u8 << day;
            if mask & bit != 0 {
                return Err(invalid());
            }
            mask |= bit;
        }
        Ok(Self { mask })
    }

    #[must_use]
    pub fn every_day() -> Self {
        Self {
            mask: Self::mask_of(Self::EVERY_DAY),
        }
    }

    #[must_use]
    pub fn workdays() -> Self {
        Self {
            mask: Self::mask_of(Self::WORKDAYS),
        }
    }

    /// Whether the ISO weekday `day` is part of the set.
    #[must_use]
    pub fn contains(&self, day: u8) -> bool {
        (1..=7).contains(&day) && self.mask & (1 << day) != 0
    }

    fn mask_of(days: &str) -> u8 {
        days.chars()
            .filter_map(|c| c.to_digit(10))
            .fold(0, |mask, d| mask | (1 << d))
    }
}

impl Default for RepeatDays {
    fn default() -> Self {
        Self::every_day()
    }
}

impl fmt::Display for RepeatDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in 1..=7u8 {
            if self.contains(day) {
                write!(f, "{day}")?;
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for RepeatDays {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepeatDays> for String {
    fn from(value: RepeatDays) -> Self {
        value.to_string()
    }
}
