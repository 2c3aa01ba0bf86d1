pub mod calendar;
pub mod config;
pub mod engine;
pub mod holidays;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod timezone;

pub use calendar::{BusinessDayInfo, ScheduleCalendar};
pub use config::{ConfigError, ServiceConfig, WorkScheduleConfig};
pub use engine::{
    BusinessDateEngine, CalculationError, CalculationOutcome, CalculationRequest,
    CalculationResult, ErrorKind,
};
pub use holidays::file::FileHolidaySource;
pub use holidays::http::HttpHolidaySource;
pub use holidays::{
    CacheInfo, HolidayCache, HolidayError, HolidayErrorKind, HolidaySet, HolidaySource,
    StaticHolidaySource,
};
pub use timezone::TimeZoneConverter;
