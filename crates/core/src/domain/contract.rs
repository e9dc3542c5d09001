use crate::calendar::{MonthData, MonthKey};
use crate::domain::recommendation::{Arrangement, DayFlags, HolidayDetails, Recommendation};
use anyhow::{ensure, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record shape as served by the upstream recommendation service. Looser than
/// [`Recommendation`]: most fields may be missing or null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecommendation {
    pub date: NaiveDate,
    pub room_type: String,
    #[serde(default)]
    pub arrangement: Option<String>,
    #[serde(default)]
    pub recommended_arr: Option<f64>,
    #[serde(default)]
    pub recommended_occupancy: Option<f64>,
    #[serde(default)]
    pub is_holiday: Option<bool>,
    #[serde(default)]
    pub is_weekend: Option<bool>,
    #[serde(default)]
    pub is_school_holiday: Option<bool>,
    #[serde(default)]
    pub is_event: Option<bool>,
    #[serde(default)]
    pub is_bridge: Option<bool>,
    #[serde(default)]
    pub is_fasting: Option<bool>,
    #[serde(default)]
    pub day_of_week: Option<String>,
    #[serde(default)]
    pub holiday_details: Option<HolidayDetails>,
    #[serde(default)]
    pub holiday_duration: Option<i64>,
    #[serde(default)]
    pub days_of_holiday: Option<i64>,
    #[serde(default)]
    pub distance_to_holiday: Option<i64>,
}

/// `GET /api/recommendations` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRangeResponse {
    #[serde(default)]
    pub recommendations: Vec<SourceRecommendation>,
    #[serde(default)]
    pub count: Option<usize>,
}

/// `GET /api/room_types` body.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRoomTypesResponse {
    #[serde(default)]
    pub room_types: Vec<String>,
}

impl SourceRecommendation {
    pub fn validate_and_into_recommendation(self) -> anyhow::Result<Recommendation> {
        let room_type = self.room_type.trim().to_string();
        ensure!(!room_type.is_empty(), "room_type must be non-empty ({})", self.date);

        let arrangement = match self.arrangement.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(
                s.parse::<Arrangement>()
                    .with_context(|| format!("invalid arrangement for {}", self.date))?,
            ),
        };

        let recommended_arr = self.recommended_arr.map(|v| v.max(0.0)).unwrap_or(0.0);
        let recommended_occupancy = self
            .recommended_occupancy
            .map(normalize_occupancy)
            .unwrap_or(0.0);

        let holiday_details = self
            .holiday_details
            .filter(|d| d.name.is_some() || d.kind.is_some());

        Ok(Recommendation {
            date: self.date,
            room_type,
            arrangement,
            recommended_arr,
            recommended_occupancy,
            day: DayFlags {
                is_holiday: self.is_holiday.unwrap_or(false),
                is_weekend: self.is_weekend.unwrap_or(false),
                is_school_holiday: self.is_school_holiday.unwrap_or(false),
                is_event: self.is_event.unwrap_or(false),
                is_bridge: self.is_bridge.unwrap_or(false),
                is_fasting: self.is_fasting.unwrap_or(false),
                day_of_week: self.day_of_week,
                holiday_details,
                holiday_duration: self.holiday_duration.unwrap_or(0),
                days_of_holiday: self.days_of_holiday.unwrap_or(0),
                distance_to_holiday: self.distance_to_holiday.unwrap_or(0),
            },
        })
    }
}

// Values above 1 are percentages.
fn normalize_occupancy(v: f64) -> f64 {
    let v = if v > 1.0 { v / 100.0 } else { v };
    v.clamp(0.0, 1.0)
}

/// Validates one month payload and converts it into store-ready data.
///
/// Every key must fall inside `month`, every record must carry its key's date,
/// and all records of a date must agree on their [`DayFlags`].
pub fn validate_month(
    month: MonthKey,
    raw: BTreeMap<NaiveDate, Vec<SourceRecommendation>>,
) -> anyhow::Result<MonthData> {
    let mut out = MonthData::new();
    for (date, records) in raw {
        ensure!(
            MonthKey::of(date) == month,
            "source returned {date} for month {month}"
        );

        let mut recs = Vec::with_capacity(records.len());
        for rec in records {
            ensure!(
                rec.date == date,
                "record dated {} listed under {date}",
                rec.date
            );
            recs.push(rec.validate_and_into_recommendation()?);
        }
        ensure_consistent_day_flags(date, &recs)?;
        out.insert(date, recs);
    }
    Ok(out)
}

pub fn ensure_consistent_day_flags(
    date: NaiveDate,
    recs: &[Recommendation],
) -> anyhow::Result<()> {
    let Some(first) = recs.first() else {
        return Ok(());
    };
    for rec in &recs[1..] {
        ensure!(
            rec.day == first.day,
            "day-level flags disagree for {date} (room_type={} vs {})",
            first.room_type,
            rec.room_type
        );
    }
    Ok(())
}
