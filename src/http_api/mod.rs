use std::{net::SocketAddr, sync::Arc, time::Instant};

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    BusinessDateEngine, CacheInfo, CalculationError, CalculationRequest, ErrorKind, HolidayError,
    HolidaySource,
};

pub struct AppState<S> {
    engine: Arc<BusinessDateEngine<S>>,
    started_at: Instant,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            started_at: self.started_at,
        }
    }
}

impl<S: HolidaySource> AppState<S> {
    pub fn new(engine: BusinessDateEngine<S>) -> Self {
        Self::with_shared(Arc::new(engine))
    }

    pub fn with_shared(engine: Arc<BusinessDateEngine<S>>) -> Self {
        Self {
            engine,
            started_at: Instant::now(),
        }
    }

    fn engine(&self) -> Arc<BusinessDateEngine<S>> {
        self.engine.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    Invalid(String),
    HolidayService(HolidayError),
    Calculation(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<CalculationError> for ApiError {
    fn from(value: CalculationError) -> Self {
        match value {
            CalculationError::InvalidParameters(message) => ApiError::Invalid(message),
            CalculationError::HolidayService(err) => ApiError::HolidayService(err),
            err @ CalculationError::Calculation(_) => ApiError::Calculation(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: ErrorKind::InvalidParameters.as_str(),
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::HolidayService(err) => {
                let status = match err {
                    HolidayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::SERVICE_UNAVAILABLE,
                };
                let body = Json(ErrorBody {
                    error: ErrorKind::HolidayServiceError.as_str(),
                    message: format!("could not load holidays: {err}"),
                });
                (status, body).into_response()
            }
            ApiError::Calculation(message) => {
                let body = Json(ErrorBody {
                    error: ErrorKind::CalculationError.as_str(),
                    message,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BusinessDateQuery {
    days: Option<String>,
    hours: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BusinessDateResponse {
    pub date: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub name: String,
    pub version: String,
    pub status: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
}

pub fn router<S: HolidaySource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/business-date", get(business_date::<S>))
        .route("/cache", get(cache_info::<S>).delete(clear_cache::<S>))
        .with_state(state)
}

pub async fn serve<S: HolidaySource + 'static>(
    addr: SocketAddr,
    engine: BusinessDateEngine<S>,
) -> std::io::Result<()> {
    let state = AppState::new(engine);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "business-dates HTTP API listening");
    axum::serve(listener, app).await
}

pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_count(field: &str, raw: &str) -> Result<u32, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::invalid(format!(
            "'{field}' must be a non-negative integer (got '{raw}')"
        )));
    }
    trimmed
        .parse::<u32>()
        .map_err(|_| ApiError::invalid(format!("'{field}' is too large (got '{raw}')")))
}

fn parse_anchor(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    let invalid = || {
        ApiError::invalid(format!(
            "'date' must be an ISO 8601 UTC instant ending in 'Z', e.g. 2025-01-01T10:00:00Z (got '{raw}')"
        ))
    };
    if !raw.ends_with('Z') {
        return Err(invalid());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| invalid())
}

fn parse_request(query: &BusinessDateQuery) -> Result<CalculationRequest, ApiError> {
    let days = query
        .days
        .as_deref()
        .map(|raw| parse_count("days", raw))
        .transpose()?;
    let hours = query
        .hours
        .as_deref()
        .map(|raw| parse_count("hours", raw))
        .transpose()?;
    if days.is_none() && hours.is_none() {
        return Err(ApiError::invalid(
            "at least one of 'days' or 'hours' is required",
        ));
    }
    let anchor = query.date.as_deref().map(parse_anchor).transpose()?;
    Ok(CalculationRequest::new(anchor, days, hours))
}

async fn health<S: HolidaySource>(State(state): State<AppState<S>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "healthy".to_string(),
        timestamp: format_instant(Utc::now()),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

async fn business_date<S: HolidaySource>(
    State(state): State<AppState<S>>,
    query: Result<Query<BusinessDateQuery>, QueryRejection>,
) -> Result<Json<BusinessDateResponse>, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        warn!(error = %rejection, "rejected business-date query string");
        ApiError::invalid(rejection.body_text())
    })?;
    let request = parse_request(&query).inspect_err(|err| {
        warn!(?query, error = ?err, "rejected business-date request");
    })?;
    info!(?request, "calculating business date");

    let outcome = state.engine().calculate(&request).await?;
    let date = format_instant(outcome.result);
    info!(%date, "business date calculated");
    Ok(Json(BusinessDateResponse { date }))
}

async fn cache_info<S: HolidaySource>(State(state): State<AppState<S>>) -> Json<CacheInfo> {
    Json(state.engine().holiday_cache().cache_info())
}

async fn clear_cache<S: HolidaySource>(State(state): State<AppState<S>>) -> StatusCode {
    state.engine().holiday_cache().clear_cache();
    StatusCode::NO_CONTENT
}
