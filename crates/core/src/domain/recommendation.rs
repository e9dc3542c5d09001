use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rate plan a recommendation is quoted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arrangement {
    /// Room + breakfast.
    RB,
    /// Room only.
    RO,
}

impl fmt::Display for Arrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arrangement::RB => f.write_str("RB"),
            Arrangement::RO => f.write_str("RO"),
        }
    }
}

impl FromStr for Arrangement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "RB" => Ok(Arrangement::RB),
            "RO" => Ok(Arrangement::RO),
            other => anyhow::bail!("unknown arrangement: {other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayDetails {
    pub name: Option<String>,
    pub kind: Option<String>,
}

/// Properties of the calendar date itself, shared by every record for that date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayFlags {
    pub is_holiday: bool,
    pub is_weekend: bool,
    pub is_school_holiday: bool,
    pub is_event: bool,
    pub is_bridge: bool,
    pub is_fasting: bool,
    pub day_of_week: Option<String>,
    pub holiday_details: Option<HolidayDetails>,
    pub holiday_duration: i64,
    pub days_of_holiday: i64,
    pub distance_to_holiday: i64,
}

impl DayFlags {
    /// Holiday name, ignoring blank names.
    pub fn holiday_name(&self) -> Option<&str> {
        self.holiday_details
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One priced quote for a date x room type x arrangement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub date: NaiveDate,
    pub room_type: String,
    /// `None` applies to every arrangement.
    pub arrangement: Option<Arrangement>,
    pub recommended_arr: f64,
    pub recommended_occupancy: f64,
    #[serde(flatten)]
    pub day: DayFlags,
}
