use crate::calendar::{DateRange, MonthData, MonthKey};
use crate::config::Settings;
use crate::domain::contract::{
    validate_month, SourceRangeResponse, SourceRecommendation, SourceRoomTypesResponse,
};
use crate::domain::recommendation::Recommendation;
use crate::pricing::filter::RoomTypeFilter;
use crate::source::error::SourceDiagnosticsError;
use crate::source::RecommendationSource;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;
const SOURCE_NAME: &str = "http_json";
const AUTH_COOKIE: &str = "auth_token";

/// JSON-over-HTTP client for the revenue management service.
#[derive(Debug, Clone)]
pub struct HttpRecommendationSource {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
    retries: u32,
}

impl HttpRecommendationSource {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_source_base_url()?.to_string();

        let timeout_secs = std::env::var("RECOMMENDATION_SOURCE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = std::env::var("RECOMMENDATION_SOURCE_RETRIES")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_RETRIES);

        Self::new(
            base_url,
            settings.source_auth_token.clone(),
            Duration::from_secs(timeout_secs),
            retries,
        )
    }

    pub fn new(
        base_url: String,
        auth_token: Option<String>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build recommendation source http client")?;

        Ok(Self {
            http,
            base_url,
            auth_token,
            retries: retries.max(1),
        })
    }

    fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.auth_token {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&format!("{AUTH_COOKIE}={token}"))?,
            );
        }
        Ok(headers)
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        let headers = self.headers()?;

        let res = self
            .http
            .get(url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .context("recommendation source request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read recommendation source response")?;

        if !status.is_success() {
            return Err(SourceDiagnosticsError {
                source_name: SOURCE_NAME,
                stage: "http",
                detail: format!("{path} returned HTTP {status}"),
                http_status: Some(status.as_u16()),
                raw_body: Some(text),
            }
            .into());
        }

        serde_json::from_str::<T>(&text).with_context(|| {
            format!("recommendation source response for {path} is not valid: {text}")
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.get_once(path, query).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if attempt >= self.retries || !is_retryable(&err) {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        path,
                        error = %err,
                        "recommendation source fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

fn is_retryable(err: &anyhow::Error) -> bool {
    if let Some(diag) = err.downcast_ref::<SourceDiagnosticsError>() {
        return diag.is_retryable();
    }
    err.downcast_ref::<reqwest::Error>().is_some()
}

fn range_query(range: DateRange, room_type: &RoomTypeFilter) -> Vec<(&'static str, String)> {
    vec![
        ("start_date", range.from.to_string()),
        ("end_date", range.to.to_string()),
        ("room_type", room_type.to_string()),
    ]
}

fn convert_range(range: DateRange, body: SourceRangeResponse) -> Result<Vec<Recommendation>> {
    if let Some(count) = body.count {
        if count != body.recommendations.len() {
            tracing::warn!(
                count,
                received = body.recommendations.len(),
                %range,
                "recommendation count does not match payload"
            );
        }
    }

    let mut out = Vec::with_capacity(body.recommendations.len());
    for rec in body.recommendations {
        anyhow::ensure!(
            rec.date >= range.from && rec.date <= range.to,
            "source returned {} outside {range}",
            rec.date
        );
        out.push(rec.validate_and_into_recommendation()?);
    }
    Ok(out)
}

#[async_trait::async_trait]
impl RecommendationSource for HttpRecommendationSource {
    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch_month(&self, month: MonthKey) -> Result<MonthData> {
        let path = format!("/api/calendar/{}/{}", month.year, month.month);
        let raw: BTreeMap<NaiveDate, Vec<SourceRecommendation>> =
            self.get_json(&path, &[]).await?;
        validate_month(month, raw).with_context(|| format!("invalid calendar data for {month}"))
    }

    async fn fetch_range(
        &self,
        range: DateRange,
        room_type: &RoomTypeFilter,
    ) -> Result<Vec<Recommendation>> {
        let body: SourceRangeResponse = self
            .get_json("/api/recommendations", &range_query(range, room_type))
            .await?;
        convert_range(range, body)
    }

    async fn fetch_room_types(&self) -> Result<Vec<String>> {
        let body: SourceRoomTypesResponse = self.get_json("/api/room_types", &[]).await?;
        Ok(body
            .room_types
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}
