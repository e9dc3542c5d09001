use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A calendar month, ordered by year then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(self) -> Option<NaiveDate> {
        self.next().first_day()?.pred_opt()
    }

    pub fn next(self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// Whole month as a range; `None` for an invalid month number.
    pub fn range(self) -> Option<DateRange> {
        Some(DateRange::new(self.first_day()?, self.last_day()?))
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Inclusive `{from, to}` pair of calendar dates.
///
/// `from <= to` is expected but not enforced here; use [`DateRange::try_new`] at
/// the edges where user input arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn try_new(from: NaiveDate, to: NaiveDate) -> anyhow::Result<Self> {
        anyhow::ensure!(from <= to, "range start {from} is after range end {to}");
        Ok(Self::new(from, to))
    }

    /// Inclusive number of calendar days; 0 for an inverted range.
    pub fn day_count(&self) -> u64 {
        let days = (self.to - self.from).num_days();
        if days < 0 {
            0
        } else {
            days as u64 + 1
        }
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let to = self.to;
        self.from.iter_days().take_while(move |d| *d <= to)
    }

    pub fn shifted(&self, delta_years: i32) -> Option<DateRange> {
        shifted_range(*self, delta_years)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.from, self.to)
    }
}

pub fn enumerate_days(range: DateRange) -> Vec<NaiveDate> {
    range.days().collect()
}

/// Same month and day number, `delta_years` away.
///
/// A day that does not exist in the target year rolls over into the next month,
/// so Feb 29 shifted into a common year lands on March 1. `None` only when the
/// target year is outside chrono's representable range.
pub fn year_shift(date: NaiveDate, delta_years: i32) -> Option<NaiveDate> {
    let year = date.year().checked_add(delta_years)?;
    if let Some(d) = NaiveDate::from_ymd_opt(year, date.month(), date.day()) {
        return Some(d);
    }
    NaiveDate::from_ymd_opt(year, date.month(), 1)?
        .checked_add_days(Days::new(u64::from(date.day() - 1)))
}

/// Shifts both endpoints independently; the day count may differ from the input.
pub fn shifted_range(range: DateRange, delta_years: i32) -> Option<DateRange> {
    Some(DateRange::new(
        year_shift(range.from, delta_years)?,
        year_shift(range.to, delta_years)?,
    ))
}

/// Every month touched by at least one day of the range.
pub fn month_span(range: DateRange) -> BTreeSet<MonthKey> {
    let mut out = BTreeSet::new();
    if range.from > range.to {
        return out;
    }

    let last = MonthKey::of(range.to);
    let mut cur = MonthKey::of(range.from);
    while cur <= last {
        out.insert(cur);
        cur = cur.next();
    }
    out
}
