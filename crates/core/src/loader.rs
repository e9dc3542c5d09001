use crate::calendar::{month_span, CalendarStore, DateRange, MergeOutcome, MonthKey};
use crate::source::RecommendationSource;
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What happened to each month requested in one load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub requested: Vec<MonthKey>,
    pub merged: Vec<MonthKey>,
    pub stale: Vec<MonthKey>,
    pub failed: Vec<MonthKey>,
}

/// Months needed to aggregate `range` and the same range one year earlier.
pub fn months_for_calculator(range: DateRange) -> BTreeSet<MonthKey> {
    let mut months = month_span(range);
    if let Some(prev) = range.shifted(-1) {
        months.extend(month_span(prev));
    }
    months
}

/// Fetches months concurrently and merges each into the shared store as it
/// arrives.
#[derive(Clone)]
pub struct BulkLoader {
    source: Arc<dyn RecommendationSource>,
}

impl BulkLoader {
    pub fn new(source: Arc<dyn RecommendationSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn RecommendationSource> {
        &self.source
    }

    pub async fn load_calculator_range(
        &self,
        store: &RwLock<CalendarStore>,
        range: DateRange,
    ) -> LoadReport {
        self.load_months(store, months_for_calculator(range)).await
    }

    /// One fetch per month, all in flight at once. Failed fetches are logged and
    /// leave the store untouched for that month.
    pub async fn load_months(
        &self,
        store: &RwLock<CalendarStore>,
        months: BTreeSet<MonthKey>,
    ) -> LoadReport {
        let mut report = LoadReport {
            requested: months.iter().copied().collect(),
            ..LoadReport::default()
        };

        let tickets = {
            let mut guard = store.write().await;
            months
                .into_iter()
                .map(|m| guard.issue_ticket(m))
                .collect::<Vec<_>>()
        };

        let source = self.source.as_ref();
        let mut pending: FuturesUnordered<_> = tickets
            .into_iter()
            .map(|ticket| async move {
                let res = source.fetch_month(ticket.month).await;
                (ticket, res)
            })
            .collect();

        while let Some((ticket, res)) = pending.next().await {
            match res {
                Ok(data) => {
                    let days = data.len();
                    let outcome = store.write().await.merge_month(ticket, data);
                    match outcome {
                        MergeOutcome::Applied => {
                            tracing::debug!(
                                month = %ticket.month,
                                seq = ticket.seq,
                                days,
                                "merged month"
                            );
                            report.merged.push(ticket.month);
                        }
                        MergeOutcome::Stale => {
                            tracing::info!(
                                month = %ticket.month,
                                seq = ticket.seq,
                                "dropping stale month response"
                            );
                            report.stale.push(ticket.month);
                        }
                    }
                }
                Err(err) => {
                    let err = format!("{err:#}");
                    tracing::warn!(
                        month = %ticket.month,
                        source = self.source.source_name(),
                        error = %err,
                        "month fetch failed; keeping previous data"
                    );
                    report.failed.push(ticket.month);
                }
            }
        }

        report.merged.sort();
        report.stale.sort();
        report.failed.sort();
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::MonthData;
    use crate::domain::recommendation::{Arrangement, DayFlags, Recommendation};
    use crate::pricing::aggregate::aggregate;
    use crate::pricing::filter::RoomTypeFilter;
    use anyhow::Result;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(date: NaiveDate, arr: f64) -> Recommendation {
        Recommendation {
            date,
            room_type: "Deluxe".to_string(),
            arrangement: Some(Arrangement::RB),
            recommended_arr: arr,
            recommended_occupancy: 0.5,
            day: DayFlags::default(),
        }
    }

    /// Serves one record per day priced at `base + day`, with per-month delays
    /// and failures.
    #[derive(Default)]
    struct FakeSource {
        base: f64,
        delays_ms: HashMap<MonthKey, u64>,
        failing: BTreeSet<MonthKey>,
        calls: Mutex<Vec<MonthKey>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn calls(&self) -> Vec<MonthKey> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort();
            calls
        }
    }

    #[async_trait::async_trait]
    impl RecommendationSource for FakeSource {
        fn source_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_month(&self, month: MonthKey) -> Result<MonthData> {
            self.calls.lock().unwrap().push(month);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(ms) = self.delays_ms.get(&month) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            anyhow::ensure!(!self.failing.contains(&month), "boom for {month}");

            let range = month.range().unwrap();
            Ok(range
                .days()
                .map(|day| {
                    use chrono::Datelike;
                    (day, vec![rec(day, self.base + day.day() as f64)])
                })
                .collect())
        }

        async fn fetch_range(
            &self,
            _range: DateRange,
            _room_type: &RoomTypeFilter,
        ) -> Result<Vec<Recommendation>> {
            Ok(Vec::new())
        }

        async fn fetch_room_types(&self) -> Result<Vec<String>> {
            Ok(vec!["Deluxe".to_string()])
        }
    }

    #[test]
    fn calculator_months_cover_both_years() {
        let months = months_for_calculator(DateRange::new(d(2025, 1, 30), d(2025, 2, 2)));
        assert_eq!(
            months.into_iter().collect::<Vec<_>>(),
            vec![
                MonthKey::new(2024, 1),
                MonthKey::new(2024, 2),
                MonthKey::new(2025, 1),
                MonthKey::new(2025, 2),
            ]
        );
    }

    #[tokio::test]
    async fn overlapping_months_are_fetched_once() {
        let source = Arc::new(FakeSource {
            base: 100.0,
            ..FakeSource::default()
        });
        let loader = BulkLoader::new(source.clone());
        let store = RwLock::new(CalendarStore::new());

        // 2024-03..2025-04 and its shift 2023-03..2024-04 share 2024-03 and 2024-04.
        let range = DateRange::new(d(2024, 3, 1), d(2025, 4, 30));
        let report = loader.load_calculator_range(&store, range).await;

        let calls = source.calls();
        let distinct: BTreeSet<_> = calls.iter().copied().collect();
        assert_eq!(calls.len(), distinct.len());
        assert_eq!(calls.len(), 26);
        assert_eq!(report.merged.len(), 26);
        assert!(report.failed.is_empty());

        let store = store.read().await;
        assert_eq!(store.lookup(d(2023, 3, 1))[0].recommended_arr, 101.0);
        assert_eq!(store.lookup(d(2025, 4, 30))[0].recommended_arr, 130.0);
    }

    #[tokio::test]
    async fn failed_month_keeps_previous_data_and_others_merge() {
        let june_prev = MonthKey::new(2024, 6);
        let source = Arc::new(FakeSource {
            base: 0.0,
            failing: [june_prev].into_iter().collect(),
            ..FakeSource::default()
        });
        let loader = BulkLoader::new(source);

        let mut seeded = CalendarStore::new();
        let mut old = MonthData::new();
        old.insert(d(2024, 6, 1), vec![rec(d(2024, 6, 1), 42.0)]);
        seeded.merge(old);
        let store = RwLock::new(seeded);

        let range = DateRange::new(d(2025, 6, 1), d(2025, 6, 2));
        let report = loader.load_calculator_range(&store, range).await;
        assert_eq!(report.failed, vec![june_prev]);
        assert_eq!(report.merged, vec![MonthKey::new(2025, 6)]);

        let store = store.read().await;
        assert_eq!(store.lookup(d(2024, 6, 1))[0].recommended_arr, 42.0);
        assert!(store.lookup(d(2024, 6, 2)).is_empty());

        let agg = aggregate(&store, range, &RoomTypeFilter::All, Arrangement::RB);
        assert_eq!(agg.total, 3.0);
        assert_eq!(agg.per_night, 1.5);
    }

    #[tokio::test]
    async fn completions_in_any_order_all_merge() {
        let slow = MonthKey::new(2025, 1);
        let source = Arc::new(FakeSource {
            base: 0.0,
            delays_ms: [(slow, 30)].into_iter().collect(),
            ..FakeSource::default()
        });
        let loader = BulkLoader::new(source);
        let store = RwLock::new(CalendarStore::new());

        let months: BTreeSet<_> = [slow, MonthKey::new(2025, 2), MonthKey::new(2025, 3)]
            .into_iter()
            .collect();
        let report = loader.load_months(&store, months).await;
        assert_eq!(report.merged.len(), 3);
        assert_eq!(store.read().await.len(), 31 + 28 + 31);
    }

    #[tokio::test]
    async fn months_are_fetched_concurrently() {
        let months: BTreeSet<_> = (1..=3).map(|m| MonthKey::new(2025, m)).collect();
        let source = Arc::new(FakeSource {
            base: 0.0,
            delays_ms: months.iter().map(|m| (*m, 100)).collect(),
            ..FakeSource::default()
        });
        let loader = BulkLoader::new(source.clone());
        let store = RwLock::new(CalendarStore::new());

        let started = Instant::now();
        let report = loader.load_months(&store, months).await;
        let elapsed = started.elapsed();

        assert_eq!(report.merged.len(), 3);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 3);
        // One after another would take at least 300ms.
        assert!(elapsed < Duration::from_millis(250), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn slow_older_load_does_not_clobber_newer_one() {
        let june = MonthKey::new(2025, 6);
        let slow_old = Arc::new(FakeSource {
            base: 1000.0,
            delays_ms: [(june, 50)].into_iter().collect(),
            ..FakeSource::default()
        });
        let fast_new = Arc::new(FakeSource {
            base: 2000.0,
            ..FakeSource::default()
        });
        let store = RwLock::new(CalendarStore::new());
        let months: BTreeSet<_> = [june].into_iter().collect();

        let old_loader = BulkLoader::new(slow_old);
        let new_loader = BulkLoader::new(fast_new);

        let old = old_loader.load_months(&store, months.clone());
        let new = async {
            // Issued after the slow load has taken its ticket.
            tokio::time::sleep(Duration::from_millis(5)).await;
            new_loader.load_months(&store, months.clone()).await
        };
        let (old_report, new_report) = tokio::join!(old, new);

        assert_eq!(new_report.merged, vec![june]);
        assert_eq!(old_report.stale, vec![june]);
        assert_eq!(
            store.read().await.lookup(d(2025, 6, 1))[0].recommended_arr,
            2001.0
        );
    }
}
