use crate::domain::recommendation::{Arrangement, Recommendation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub const ALL_ROOM_TYPES: &str = "All";

/// `"All"` or one exact room type identifier. A blank value also means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoomTypeFilter {
    #[default]
    All,
    Only(String),
}

impl RoomTypeFilter {
    pub fn accepts(&self, room_type: &str) -> bool {
        match self {
            RoomTypeFilter::All => true,
            RoomTypeFilter::Only(want) => want == room_type,
        }
    }
}

impl From<String> for RoomTypeFilter {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == ALL_ROOM_TYPES {
            RoomTypeFilter::All
        } else {
            RoomTypeFilter::Only(s)
        }
    }
}

impl From<RoomTypeFilter> for String {
    fn from(f: RoomTypeFilter) -> Self {
        f.to_string()
    }
}

impl FromStr for RoomTypeFilter {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RoomTypeFilter::from(s.to_string()))
    }
}

impl fmt::Display for RoomTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomTypeFilter::All => f.write_str(ALL_ROOM_TYPES),
            RoomTypeFilter::Only(s) => f.write_str(s),
        }
    }
}

/// Room type must match exactly (or the filter is "All"); a record without an
/// arrangement applies to every arrangement.
pub fn matches(
    rec: &Recommendation,
    room_type: &RoomTypeFilter,
    arrangement: Arrangement,
) -> bool {
    let arrangement_ok = match rec.arrangement {
        None => true,
        Some(a) => a == arrangement,
    };
    arrangement_ok && room_type.accepts(&rec.room_type)
}
