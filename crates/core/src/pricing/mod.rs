pub mod aggregate;
pub mod filter;
pub mod flags;
pub mod report;

pub use aggregate::{
    aggregate, aggregate_previous_year, compare_year_over_year, Aggregate, CalculatorQuery,
    YearOverYear,
};
pub use filter::{matches, RoomTypeFilter};
pub use flags::summarize_flags;
pub use report::{build_report, CalculatorReport};
