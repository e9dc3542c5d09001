use crate::calendar::{CalendarStore, DateRange};
use crate::domain::recommendation::DayFlags;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Labels for one day, in display priority order.
pub fn day_labels(flags: &DayFlags) -> Vec<String> {
    let mut out = Vec::new();
    let name = flags.holiday_name();

    if flags.is_holiday {
        out.push(match name {
            Some(n) => format!("Holiday: {n}"),
            None => "Holiday".to_string(),
        });
    }
    if flags.is_school_holiday {
        out.push("School Holiday".to_string());
    }
    if flags.is_event {
        out.push(match name {
            Some(n) => format!("Event: {n}"),
            None => "Event".to_string(),
        });
    }
    if flags.is_fasting {
        out.push("Fasting".to_string());
    }
    if flags.is_weekend {
        out.push("Weekend".to_string());
    }
    out
}

/// Day labels for every date in `range` that has data and at least one flag set.
///
/// Flags are read from the first record of each date only.
pub fn summarize_flags(
    store: &CalendarStore,
    range: DateRange,
) -> BTreeMap<NaiveDate, Vec<String>> {
    let mut out = BTreeMap::new();
    for day in range.days() {
        let Some(first) = store.lookup(day).first() else {
            continue;
        };
        let labels = day_labels(&first.day);
        if !labels.is_empty() {
            out.insert(day, labels);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MonthData;
    use crate::domain::recommendation::{HolidayDetails, Recommendation};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn rec_with(date: NaiveDate, day: DayFlags) -> Recommendation {
        Recommendation {
            date,
            room_type: "Deluxe".to_string(),
            arrangement: None,
            recommended_arr: 0.0,
            recommended_occupancy: 0.0,
            day,
        }
    }

    fn named(name: &str) -> Option<HolidayDetails> {
        Some(HolidayDetails {
            name: Some(name.to_string()),
            kind: Some("national".to_string()),
        })
    }

    #[test]
    fn named_holiday_and_flagless_day() {
        let mut data = MonthData::new();
        data.insert(
            d(31),
            vec![rec_with(
                d(31),
                DayFlags {
                    is_holiday: true,
                    holiday_details: named("Eid"),
                    ..DayFlags::default()
                },
            )],
        );
        data.insert(d(30), vec![rec_with(d(30), DayFlags::default())]);
        let mut store = CalendarStore::new();
        store.merge(data);

        let got = summarize_flags(&store, DateRange::new(d(29), d(31)));
        assert_eq!(got.len(), 1);
        assert_eq!(got[&d(31)], vec!["Holiday: Eid".to_string()]);
        assert!(!got.contains_key(&d(30)));
    }

    #[test]
    fn labels_follow_priority_order() {
        let flags = DayFlags {
            is_holiday: true,
            is_weekend: true,
            is_school_holiday: true,
            is_event: true,
            is_fasting: true,
            ..DayFlags::default()
        };
        assert_eq!(
            day_labels(&flags),
            vec!["Holiday", "School Holiday", "Event", "Fasting", "Weekend"]
        );
    }

    #[test]
    fn blank_name_falls_back_to_generic_label() {
        let flags = DayFlags {
            is_event: true,
            holiday_details: named("  "),
            ..DayFlags::default()
        };
        assert_eq!(day_labels(&flags), vec!["Event"]);

        let flags = DayFlags {
            is_event: true,
            holiday_details: named("Java Jazz"),
            ..DayFlags::default()
        };
        assert_eq!(day_labels(&flags), vec!["Event: Java Jazz"]);
    }

    #[test]
    fn only_first_record_is_consulted() {
        let weekend = DayFlags {
            is_weekend: true,
            ..DayFlags::default()
        };
        let mut data = MonthData::new();
        data.insert(
            d(1),
            vec![rec_with(d(1), DayFlags::default()), rec_with(d(1), weekend)],
        );
        let mut store = CalendarStore::new();
        store.merge(data);

        assert!(summarize_flags(&store, DateRange::single(d(1))).is_empty());
    }

    #[test]
    fn results_are_in_date_order() {
        let weekend = DayFlags {
            is_weekend: true,
            ..DayFlags::default()
        };
        let mut data = MonthData::new();
        for day in [9, 1, 2, 8] {
            data.insert(d(day), vec![rec_with(d(day), weekend.clone())]);
        }
        let mut store = CalendarStore::new();
        store.merge(data);

        let got = summarize_flags(&store, DateRange::new(d(1), d(31)));
        assert_eq!(got.keys().copied().collect::<Vec<_>>(), vec![d(1), d(2), d(8), d(9)]);
    }
}
