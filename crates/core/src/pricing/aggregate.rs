use crate::calendar::{CalendarStore, DateRange};
use crate::domain::recommendation::{Arrangement, Recommendation};
use crate::pricing::filter::{matches, RoomTypeFilter};
use serde::{Deserialize, Serialize};

/// Range plus record filters, as chosen in the calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorQuery {
    pub range: DateRange,
    pub room_type: RoomTypeFilter,
    pub arrangement: Arrangement,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub total: f64,
    /// `total` spread over every night of the range, with or without data.
    pub per_night: f64,
    pub nights: u64,
    pub matched: usize,
    pub average_occupancy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearOverYear {
    pub current: Aggregate,
    pub previous: Aggregate,
    pub change: f64,
    pub change_pct: Option<f64>,
}

/// Records of `range` that pass the filters, across all days.
pub fn matched_records<'a>(
    store: &'a CalendarStore,
    range: DateRange,
    room_type: &'a RoomTypeFilter,
    arrangement: Arrangement,
) -> impl Iterator<Item = &'a Recommendation> + 'a {
    range
        .days()
        .flat_map(move |day| store.lookup(day).iter())
        .filter(move |rec| matches(rec, room_type, arrangement))
}

pub fn aggregate(
    store: &CalendarStore,
    range: DateRange,
    room_type: &RoomTypeFilter,
    arrangement: Arrangement,
) -> Aggregate {
    let nights = range.day_count();

    let mut total = 0.0;
    let mut occupancy = 0.0;
    let mut matched: usize = 0;
    for rec in matched_records(store, range, room_type, arrangement) {
        total += rec.recommended_arr;
        occupancy += rec.recommended_occupancy;
        matched += 1;
    }

    Aggregate {
        total,
        per_night: if nights == 0 { 0.0 } else { total / nights as f64 },
        nights,
        matched,
        average_occupancy: if matched == 0 { 0.0 } else { occupancy / matched as f64 },
    }
}

/// Same aggregation over the range one year earlier.
pub fn aggregate_previous_year(
    store: &CalendarStore,
    range: DateRange,
    room_type: &RoomTypeFilter,
    arrangement: Arrangement,
) -> Aggregate {
    match range.shifted(-1) {
        Some(prev) => aggregate(store, prev, room_type, arrangement),
        None => Aggregate::default(),
    }
}

pub fn compare_year_over_year(store: &CalendarStore, query: &CalculatorQuery) -> YearOverYear {
    let current = aggregate(store, query.range, &query.room_type, query.arrangement);
    let previous = aggregate_previous_year(store, query.range, &query.room_type, query.arrangement);
    YearOverYear::new(current, previous)
}

impl YearOverYear {
    pub fn new(current: Aggregate, previous: Aggregate) -> Self {
        let change = current.total - previous.total;
        let change_pct = if previous.total == 0.0 {
            None
        } else {
            Some(change / previous.total * 100.0)
        };
        Self {
            current,
            previous,
            change,
            change_pct,
        }
    }
}
