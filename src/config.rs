use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("invalid work schedule: {0}")]
    Schedule(String),
}

impl ConfigError {
    fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Daily work window and lunch break, in whole local hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkScheduleConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub lunch_start_hour: u32,
    pub lunch_end_hour: u32,
}

impl Default for WorkScheduleConfig {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 17,
            lunch_start_hour: 12,
            lunch_end_hour: 13,
        }
    }
}

impl WorkScheduleConfig {
    pub fn new(start_hour: u32, end_hour: u32, lunch_start_hour: u32, lunch_end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
            lunch_start_hour,
            lunch_end_hour,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let hours = [
            ("start_hour", self.start_hour),
            ("end_hour", self.end_hour),
            ("lunch_start_hour", self.lunch_start_hour),
            ("lunch_end_hour", self.lunch_end_hour),
        ];
        for (name, hour) in hours {
            if hour > 23 {
                return Err(ConfigError::Schedule(format!(
                    "{name} must be between 0 and 23 (got {hour})"
                )));
            }
        }
        if self.start_hour >= self.end_hour {
            return Err(ConfigError::Schedule(format!(
                "start_hour {} must be before end_hour {}",
                self.start_hour, self.end_hour
            )));
        }
        if self.lunch_start_hour >= self.lunch_end_hour {
            return Err(ConfigError::Schedule(format!(
                "lunch_start_hour {} must be before lunch_end_hour {}",
                self.lunch_start_hour, self.lunch_end_hour
            )));
        }
        if self.lunch_start_hour < self.start_hour || self.lunch_end_hour > self.end_hour {
            return Err(ConfigError::Schedule(format!(
                "lunch break {}-{} must fall inside the work window {}-{}",
                self.lunch_start_hour, self.lunch_end_hour, self.start_hour, self.end_hour
            )));
        }
        if self.lunch_start_hour == self.start_hour && self.lunch_end_hour == self.end_hour {
            return Err(ConfigError::Schedule(format!(
                "lunch break {}-{} leaves no working time in the work window",
                self.lunch_start_hour, self.lunch_end_hour
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub holiday_api_url: String,
    pub cache_ttl_minutes: u32,
    pub holiday_timeout: Duration,
    pub work_schedule: WorkScheduleConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            holiday_api_url: Self::DEFAULT_HOLIDAY_API_URL.to_string(),
            cache_ttl_minutes: 60,
            holiday_timeout: Duration::from_millis(10_000),
            work_schedule: WorkScheduleConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub const DEFAULT_HOLIDAY_API_URL: &'static str =
        "https://content.capta.co/Recruitment/WorkingDays.json";

    pub const HTTP_ADDR_VAR: &'static str = "BUSINESS_DATES_HTTP_ADDR";
    pub const HOLIDAY_API_URL_VAR: &'static str = "HOLIDAY_API_URL";
    pub const CACHE_TTL_MINUTES_VAR: &'static str = "CACHE_TTL_MINUTES";
    pub const HOLIDAY_TIMEOUT_MS_VAR: &'static str = "HOLIDAY_TIMEOUT_MS";
    pub const WORK_START_HOUR_VAR: &'static str = "WORK_START_HOUR";
    pub const WORK_END_HOUR_VAR: &'static str = "WORK_END_HOUR";
    pub const LUNCH_START_HOUR_VAR: &'static str = "LUNCH_START_HOUR";
    pub const LUNCH_END_HOUR_VAR: &'static str = "LUNCH_END_HOUR";

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = match read(Self::HTTP_ADDR_VAR) {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|err| {
                ConfigError::invalid(Self::HTTP_ADDR_VAR, &raw, err.to_string())
            })?,
            None => defaults.bind_addr,
        };

        let holiday_api_url = match read(Self::HOLIDAY_API_URL_VAR) {
            Some(raw) => {
                let parsed = reqwest::Url::parse(&raw).map_err(|err| {
                    ConfigError::invalid(Self::HOLIDAY_API_URL_VAR, &raw, err.to_string())
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::invalid(
                        Self::HOLIDAY_API_URL_VAR,
                        &raw,
                        "scheme must be http or https",
                    ));
                }
                raw
            }
            None => defaults.holiday_api_url,
        };

        let cache_ttl_minutes = match read(Self::CACHE_TTL_MINUTES_VAR) {
            Some(raw) => parse_positive(Self::CACHE_TTL_MINUTES_VAR, &raw)?,
            None => defaults.cache_ttl_minutes,
        };

        let holiday_timeout = match read(Self::HOLIDAY_TIMEOUT_MS_VAR) {
            Some(raw) => {
                Duration::from_millis(u64::from(parse_positive(Self::HOLIDAY_TIMEOUT_MS_VAR, &raw)?))
            }
            None => defaults.holiday_timeout,
        };

        let hour = |key: &'static str, default: u32| -> Result<u32, ConfigError> {
            match read(key) {
                Some(raw) => {
                    let value = raw
                        .parse::<u32>()
                        .map_err(|err| ConfigError::invalid(key, &raw, err.to_string()))?;
                    if value > 23 {
                        return Err(ConfigError::invalid(key, &raw, "must be between 0 and 23"));
                    }
                    Ok(value)
                }
                None => Ok(default),
            }
        };
        let base = defaults.work_schedule;
        let work_schedule = WorkScheduleConfig {
            start_hour: hour(Self::WORK_START_HOUR_VAR, base.start_hour)?,
            end_hour: hour(Self::WORK_END_HOUR_VAR, base.end_hour)?,
            lunch_start_hour: hour(Self::LUNCH_START_HOUR_VAR, base.lunch_start_hour)?,
            lunch_end_hour: hour(Self::LUNCH_END_HOUR_VAR, base.lunch_end_hour)?,
        };
        work_schedule.validate()?;

        Ok(Self {
            bind_addr,
            holiday_api_url,
            cache_ttl_minutes,
            holiday_timeout,
            work_schedule,
        })
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.cache_ttl_minutes))
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    let value = raw
        .parse::<u32>()
        .map_err(|err| ConfigError::invalid(key, raw, err.to_string()))?;
    if value == 0 {
        return Err(ConfigError::invalid(key, raw, "must be greater than zero"));
    }
    Ok(value)
}
