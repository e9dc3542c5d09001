use anyhow::Context;
use clap::Parser;
use ratecal_core::calendar::{CalendarStore, DateRange};
use ratecal_core::domain::recommendation::Arrangement;
use ratecal_core::loader::BulkLoader;
use ratecal_core::pricing::{build_report, CalculatorQuery, RoomTypeFilter};
use ratecal_core::source::http::HttpRecommendationSource;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "ratecal_worker")]
struct Args {
    /// First night of the range (YYYY-MM-DD).
    #[arg(long)]
    from: String,

    /// Last night of the range (YYYY-MM-DD). Defaults to --from.
    #[arg(long)]
    to: Option<String>,

    /// Exact room type, or "All".
    #[arg(long, default_value = "All")]
    room_type: String,

    /// RB (room + breakfast) or RO (room only).
    #[arg(long, default_value = "RB")]
    arrangement: String,
}

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

    let args = Args::parse();
    let query = resolve_query(&args)?;

    let source = HttpRecommendationSource::from_settings(&settings)?;
    let loader = BulkLoader::new(Arc::new(source));
    let store = RwLock::new(CalendarStore::new());

    let load = loader.load_calculator_range(&store, query.range).await;
    if !load.failed.is_empty() {
        let err = anyhow::anyhow!("{} month fetch(es) failed", load.failed.len());
        sentry_anyhow::capture_anyhow(&err);
        tracing::warn!(failed = ?load.failed, "aggregates may be incomplete");
    }

    let report = build_report(&*store.read().await, query);
    tracing::info!(
        range = %report.query.range,
        total = report.comparison.current.total,
        per_night = report.comparison.current.per_night,
        previous_total = report.comparison.previous.total,
        flagged_days = report.flags.len(),
        months_merged = load.merged.len(),
        "calculator run finished"
    );

    let out = serde_json::to_string_pretty(&report).context("serialize report failed")?;
    println!("{out}");
    Ok(())
}

fn resolve_query(args: &Args) -> anyhow::Result<CalculatorQuery> {
    let from = parse_date(&args.from)?;
    let to = match args.to.as_deref() {
        Some(s) => parse_date(s)?,
        None => from,
    };

    Ok(CalculatorQuery {
        range: DateRange::try_new(from, to)?,
        room_type: RoomTypeFilter::from(args.room_type.clone()),
        arrangement: args.arrangement.parse::<Arrangement>()?,
    })
}

fn parse_date(s: &str) -> anyhow::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date {s:?}, expected YYYY-MM-DD"))
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
