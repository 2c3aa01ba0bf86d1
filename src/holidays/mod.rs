use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod file;
pub mod http;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HolidayErrorKind {
    NetworkError,
    ParseError,
    TimeoutError,
    UnknownError,
}

impl HolidayErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HolidayErrorKind::NetworkError => "NETWORK_ERROR",
            HolidayErrorKind::ParseError => "PARSE_ERROR",
            HolidayErrorKind::TimeoutError => "TIMEOUT_ERROR",
            HolidayErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

/// Why the holiday list could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HolidayError {
    #[error("timed out fetching holidays from {url}")]
    Timeout { url: String },
    #[error("network error fetching holidays from {url}: {message}")]
    Network {
        status: Option<u16>,
        url: String,
        message: String,
    },
    #[error("invalid holiday payload: {0}")]
    Parse(String),
    #[error("unexpected holiday source error: {0}")]
    Unknown(String),
}

impl HolidayError {
    pub fn kind(&self) -> HolidayErrorKind {
        match self {
            HolidayError::Timeout { .. } => HolidayErrorKind::TimeoutError,
            HolidayError::Network { .. } => HolidayErrorKind::NetworkError,
            HolidayError::Parse(_) => HolidayErrorKind::ParseError,
            HolidayError::Unknown(_) => HolidayErrorKind::UnknownError,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            HolidayError::Network { status, .. } => *status,
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            HolidayError::Timeout { url } | HolidayError::Network { url, .. } => Some(url),
            _ => None,
        }
    }
}

/// Immutable snapshot of holiday dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HolidaySet {
    dates: BTreeSet<NaiveDate>,
}

impl HolidaySet {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Dates in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.dates.iter().copied()
    }

    pub fn for_year(&self, year: i32) -> Vec<NaiveDate> {
        self.iter().filter(|date| date.year() == year).collect()
    }

    /// Validates a source payload: a JSON array whose every element is a `YYYY-MM-DD` string.
    pub fn from_payload(payload: &Value) -> Result<Self, HolidayError> {
        let items = payload.as_array().ok_or_else(|| {
            HolidayError::Parse(format!(
                "expected a JSON array of dates, got {}",
                json_type_name(payload)
            ))
        })?;

        let mut dates = BTreeSet::new();
        for (index, item) in items.iter().enumerate() {
            let text = item.as_str().ok_or_else(|| {
                HolidayError::Parse(format!(
                    "element {index} must be a YYYY-MM-DD string, got {}",
                    json_type_name(item)
                ))
            })?;
            dates.insert(parse_holiday_date(text).map_err(|reason| {
                HolidayError::Parse(format!("element {index} ('{text}') {reason}"))
            })?);
        }
        Ok(Self { dates })
    }
}

impl FromIterator<NaiveDate> for HolidaySet {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        Self {
            dates: iter.into_iter().collect(),
        }
    }
}

fn parse_holiday_date(text: &str) -> Result<NaiveDate, &'static str> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return Err("is not formatted as YYYY-MM-DD");
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| "is not a calendar date")
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Upstream that produces the raw holiday payload.
pub trait HolidaySource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Value, HolidayError>> + Send;

    /// Human-readable origin used in logs.
    fn describe(&self) -> String;
}

/// In-memory list of date strings, validated like any other payload.
#[derive(Debug, Clone, Default)]
pub struct StaticHolidaySource {
    dates: Vec<String>,
}

impl StaticHolidaySource {
    pub fn new<I, S>(dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dates: dates.into_iter().map(Into::into).collect(),
        }
    }
}

impl HolidaySource for StaticHolidaySource {
    async fn fetch(&self) -> Result<Value, HolidayError> {
        Ok(Value::from(self.dates.clone()))
    }

    fn describe(&self) -> String {
        format!("static list ({} dates)", self.dates.len())
    }
}

#[derive(Debug, Clone)]
pub struct HolidayCacheEntry {
    holidays: Arc<HolidaySet>,
    fetched_at: DateTime<Utc>,
    ttl: Duration,
}

impl HolidayCacheEntry {
    pub fn holidays(&self) -> &Arc<HolidaySet> {
        &self.holidays
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < self.ttl
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub has_cache: bool,
    pub is_valid: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

/// TTL cache in front of a [`HolidaySource`].
///
/// The slot is replaced whole on every refresh. Concurrent misses are not coalesced: each
/// caller that observes a stale slot fetches on its own and the last write wins.
pub struct HolidayCache<S> {
    source: S,
    ttl: Duration,
    slot: RwLock<Option<Arc<HolidayCacheEntry>>>,
}

impl<S: HolidaySource> HolidayCache<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn get_holidays(&self) -> Result<Arc<HolidaySet>, HolidayError> {
        let cached = self.slot.read().clone();
        if let Some(entry) = cached {
            if entry.is_valid_at(Utc::now()) {
                debug!(fetched_at = %entry.fetched_at, "holiday cache hit");
                return Ok(entry.holidays.clone());
            }
            debug!(fetched_at = %entry.fetched_at, "holiday cache expired");
        }

        let origin = self.source.describe();
        info!(source = %origin, "fetching holidays");
        let payload = self.source.fetch().await.inspect_err(|err| {
            warn!(source = %origin, kind = err.kind().as_str(), error = %err, "holiday fetch failed");
        })?;
        let holidays = HolidaySet::from_payload(&payload).inspect_err(|err| {
            warn!(source = %origin, error = %err, "holiday payload rejected");
        })?;

        let holidays = Arc::new(holidays);
        let entry = Arc::new(HolidayCacheEntry {
            holidays: holidays.clone(),
            fetched_at: Utc::now(),
            ttl: self.ttl,
        });
        *self.slot.write() = Some(entry);
        info!(count = holidays.len(), "holiday cache refreshed");
        Ok(holidays)
    }

    pub async fn is_holiday(&self, date: NaiveDate) -> Result<bool, HolidayError> {
        Ok(self.get_holidays().await?.contains(date))
    }

    pub async fn holidays_for_year(&self, year: i32) -> Result<Vec<NaiveDate>, HolidayError> {
        Ok(self.get_holidays().await?.for_year(year))
    }

    pub fn clear_cache(&self) {
        *self.slot.write() = None;
        info!("holiday cache cleared");
    }

    pub fn cache_info(&self) -> CacheInfo {
        match self.slot.read().as_ref() {
            Some(entry) => CacheInfo {
                has_cache: true,
                is_valid: entry.is_valid_at(Utc::now()),
                last_updated: Some(entry.fetched_at),
            },
            None => CacheInfo {
                has_cache: false,
                is_valid: false,
                last_updated: None,
            },
        }
    }
}
