use crate::calendar::range::{DateRange, MonthKey};
use crate::domain::recommendation::Recommendation;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Fetch result for one month, keyed by date.
pub type MonthData = BTreeMap<NaiveDate, Vec<Recommendation>>;

/// Handed out before a month fetch; merges carrying an older ticket than the
/// last applied one for the same month are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub month: MonthKey,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    Stale,
}

/// Session-lifetime cache of recommendations per date. Grows by merging
/// fetched months; nothing is ever evicted.
#[derive(Debug, Clone, Default)]
pub struct CalendarStore {
    days: BTreeMap<NaiveDate, Vec<Recommendation>>,
    issued: HashMap<MonthKey, u64>,
    applied: HashMap<MonthKey, u64>,
}

impl CalendarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry of every date in `month_data` wholesale. Dates not in
    /// `month_data` are left alone.
    pub fn merge(&mut self, month_data: MonthData) {
        for (date, recs) in month_data {
            self.days.insert(date, recs);
        }
    }

    /// Stored records for `date`; empty when the date was never fetched.
    pub fn lookup(&self, date: NaiveDate) -> &[Recommendation] {
        self.days.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.days.contains_key(&date)
    }

    /// Stored entries within `range`, in date order.
    pub fn entries_in(&self, range: DateRange) -> MonthData {
        if range.from > range.to {
            return MonthData::new();
        }
        self.days
            .range(range.from..=range.to)
            .map(|(d, recs)| (*d, recs.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn issue_ticket(&mut self, month: MonthKey) -> FetchTicket {
        let seq = self.issued.entry(month).or_insert(0);
        *seq += 1;
        FetchTicket { month, seq: *seq }
    }

    /// Merges `month_data` unless a fetch issued after `ticket` already landed.
    pub fn merge_month(&mut self, ticket: FetchTicket, month_data: MonthData) -> MergeOutcome {
        let last = self.applied.get(&ticket.month).copied().unwrap_or(0);
        if ticket.seq < last {
            return MergeOutcome::Stale;
        }
        self.applied.insert(ticket.month, ticket.seq);
        self.merge(month_data);
        MergeOutcome::Applied
    }
}

// Equality is over stored data only; ticket bookkeeping is not observable content.
impl PartialEq for CalendarStore {
    fn eq(&self, other: &Self) -> bool {
        self.days == other.days
    }
}
