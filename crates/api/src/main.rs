use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratecal_core::calendar::{CalendarStore, DateRange, MonthData, MonthKey};
use ratecal_core::domain::recommendation::{Arrangement, Recommendation};
use ratecal_core::loader::{BulkLoader, LoadReport};
use ratecal_core::pricing::{build_report, CalculatorQuery, CalculatorReport, RoomTypeFilter};
use ratecal_core::source::http::HttpRecommendationSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = ratecal_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let source = match HttpRecommendationSource::from_settings(&settings) {
        Ok(source) => source,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "recommendation source unavailable");
            return Err(e);
        }
    };

    let state = AppState {
        store: Arc::new(RwLock::new(CalendarStore::new())),
        loader: BulkLoader::new(Arc::new(source)),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/calendar/:year/:month", get(get_calendar_month))
        .route("/calendar/day/:date", get(get_calendar_day))
        .route("/recommendations", get(get_recommendations))
        .route("/room_types", get(get_room_types))
        .route("/calculator", get(get_calculator))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

/// One session store per process; every handler reads and merges into it.
#[derive(Clone)]
struct AppState {
    store: Arc<RwLock<CalendarStore>>,
    loader: BulkLoader,
}

#[derive(Debug, Serialize)]
struct ApiCalendarMonth {
    month: MonthKey,
    load: LoadReport,
    days: MonthData,
}

async fn get_calendar_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<ApiCalendarMonth>, StatusCode> {
    let month = MonthKey::new(year, month);
    let range = month.range().ok_or(StatusCode::BAD_REQUEST)?;

    let load = state
        .loader
        .load_months(&state.store, BTreeSet::from([month]))
        .await;
    let days = state.store.read().await.entries_in(range);

    Ok(Json(ApiCalendarMonth { month, load, days }))
}

async fn get_calendar_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Vec<Recommendation>>, StatusCode> {
    let date = parse_date(&date)?;
    let recs = state.store.read().await.lookup(date).to_vec();
    Ok(Json(recs))
}

#[derive(Debug, Deserialize)]
struct RecommendationsParams {
    start_date: String,
    end_date: String,
    #[serde(default)]
    room_type: RoomTypeFilter,
}

#[derive(Debug, Serialize)]
struct ApiRecommendations {
    recommendations: Vec<Recommendation>,
    count: usize,
    range: DateRange,
    room_type: RoomTypeFilter,
}

async fn get_recommendations(
    State(state): State<AppState>,
    Query(params): Query<RecommendationsParams>,
) -> Result<Json<ApiRecommendations>, StatusCode> {
    let range = parse_range(&params.start_date, &params.end_date)?;

    let recommendations = state
        .loader
        .source()
        .fetch_range(range, &params.room_type)
        .await
        .map_err(|e| {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, %range, "recommendation range fetch failed");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(ApiRecommendations {
        count: recommendations.len(),
        recommendations,
        range,
        room_type: params.room_type,
    }))
}

#[derive(Debug, Serialize)]
struct ApiRoomTypes {
    room_types: Vec<String>,
}

async fn get_room_types(State(state): State<AppState>) -> Result<Json<ApiRoomTypes>, StatusCode> {
    let room_types = state.loader.source().fetch_room_types().await.map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        tracing::error!(error = %e, "room type fetch failed");
        StatusCode::BAD_GATEWAY
    })?;
    Ok(Json(ApiRoomTypes { room_types }))
}

#[derive(Debug, Deserialize)]
struct CalculatorParams {
    from: String,
    to: String,
    #[serde(default)]
    room_type: RoomTypeFilter,
    arrangement: Arrangement,
}

#[derive(Debug, Serialize)]
struct ApiCalculator {
    load: LoadReport,
    report: CalculatorReport,
}

async fn get_calculator(
    State(state): State<AppState>,
    Query(params): Query<CalculatorParams>,
) -> Result<Json<ApiCalculator>, StatusCode> {
    let query = CalculatorQuery {
        range: parse_range(&params.from, &params.to)?,
        room_type: params.room_type,
        arrangement: params.arrangement,
    };

    let load = state
        .loader
        .load_calculator_range(&state.store, query.range)
        .await;
    let report = build_report(&*state.store.read().await, query);

    Ok(Json(ApiCalculator { load, report }))
}

fn parse_date(s: &str) -> Result<NaiveDate, StatusCode> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| StatusCode::BAD_REQUEST)
}

fn parse_range(from: &str, to: &str) -> Result<DateRange, StatusCode> {
    DateRange::try_new(parse_date(from)?, parse_date(to)?).map_err(|_| StatusCode::BAD_REQUEST)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &ratecal_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
