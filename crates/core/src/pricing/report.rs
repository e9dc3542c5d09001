use crate::calendar::{CalendarStore, DateRange};
use crate::pricing::aggregate::{compare_year_over_year, CalculatorQuery, YearOverYear};
use crate::pricing::flags::summarize_flags;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything the calculator view shows for one query.
#[derive(Debug, Clone, Serialize)]
pub struct CalculatorReport {
    pub query: CalculatorQuery,
    pub previous_range: Option<DateRange>,
    pub comparison: YearOverYear,
    pub flags: BTreeMap<NaiveDate, Vec<String>>,
}

pub fn build_report(store: &CalendarStore, query: CalculatorQuery) -> CalculatorReport {
    let comparison = compare_year_over_year(store, &query);
    let flags = summarize_flags(store, query.range);
    CalculatorReport {
        previous_range: query.range.shifted(-1),
        query,
        comparison,
        flags,
    }
}
