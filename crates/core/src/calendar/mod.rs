pub mod range;
pub mod store;

pub use range::{enumerate_days, month_span, shifted_range, year_shift, DateRange, MonthKey};
pub use store::{CalendarStore, FetchTicket, MergeOutcome, MonthData};
