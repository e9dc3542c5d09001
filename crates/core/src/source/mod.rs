pub mod error;
pub mod http;

use crate::calendar::{DateRange, MonthData, MonthKey};
use crate::domain::recommendation::Recommendation;
use crate::pricing::filter::RoomTypeFilter;
use anyhow::Result;

/// Remote service serving pre-computed recommendations.
#[async_trait::async_trait]
pub trait RecommendationSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Every date of `month`, keyed by date.
    async fn fetch_month(&self, month: MonthKey) -> Result<MonthData>;

    async fn fetch_range(
        &self,
        range: DateRange,
        room_type: &RoomTypeFilter,
    ) -> Result<Vec<Recommendation>>;

    async fn fetch_room_types(&self) -> Result<Vec<String>>;
}
