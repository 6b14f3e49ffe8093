//! Recurrence frequencies and weekday repeat codes.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How often a frequency-recurring event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub const ALL: [Frequency; 4] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Monthly,
        Frequency::Yearly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown frequency {0:?} (expected daily, weekly, monthly or yearly)")]
pub struct UnknownFrequency(pub String);

impl FromStr for Frequency {
    type Err = UnknownFrequency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(UnknownFrequency(s.to_string())),
        }
    }
}

/// Map a repeat code (`M T W R F S U`, case-insensitive) to its weekday.
pub fn weekday_from_code(code: char) -> Option<Weekday> {
    match code.to_ascii_uppercase() {
        'M' => Some(Weekday::Mon),
        'T' => Some(Weekday::Tue),
        'W' => Some(Weekday::Wed),
        'R' => Some(Weekday::Thu),
        'F' => Some(Weekday::Fri),
        'S' => Some(Weekday::Sat),
        'U' => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn weekday_code(day: Weekday) -> char {
    match day {
        Weekday::Mon => 'M',
        Weekday::Tue => 'T',
        Weekday::Wed => 'W',
        Weekday::Thu => 'R',
        Weekday::Fri => 'F',
        Weekday::Sat => 'S',
        Weekday::Sun => 'U',
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A parsed `repeat` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatCodes {
    /// Requested weekdays in first-seen order, duplicates dropped.
    pub days: Vec<Weekday>,
    /// Characters that are not weekday codes.
    pub invalid: Vec<char>,
}

/// Split a repeat string such as `"MWF"` into weekdays.
///
/// Whitespace and commas are ignored so `"M, W, F"` reads the same as `"MWF"`.
pub fn parse_repeat(codes: &str) -> RepeatCodes {
    let mut parsed = RepeatCodes::default();
    for code in codes.chars().filter(|c| !c.is_whitespace() && *c != ',') {
        match weekday_from_code(code) {
            Some(day) if !parsed.days.contains(&day) => parsed.days.push(day),
            Some(_) => {}
            None => parsed.invalid.push(code),
        }
    }
    parsed
}
