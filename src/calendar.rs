use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, WorkScheduleConfig};
use crate::timezone::TimeZoneConverter;

/// Classification and boundaries of one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDayInfo {
    pub is_working_day: bool,
    pub is_holiday: bool,
    pub is_weekend: bool,
    pub work_start: DateTime<Utc>,
    pub work_end: DateTime<Utc>,
    pub lunch_start: DateTime<Utc>,
    pub lunch_end: DateTime<Utc>,
}

/// Monday-Friday work calendar with a daily work window and a lunch break.
///
/// Every classification takes a *local* wall-clock instant; boundaries handed back through
/// [`BusinessDayInfo`] are UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleCalendar {
    schedule: WorkScheduleConfig,
    timezone: TimeZoneConverter,
    work_start: NaiveTime,
    work_end: NaiveTime,
    lunch_start: NaiveTime,
    lunch_end: NaiveTime,
}

impl Default for ScheduleCalendar {
    fn default() -> Self {
        Self::build(WorkScheduleConfig::default(), TimeZoneConverter::default())
    }
}

impl ScheduleCalendar {
    const WORKING_DAYS: [Weekday; 5] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
    ];

    pub fn new(
        schedule: WorkScheduleConfig,
        timezone: TimeZoneConverter,
    ) -> Result<Self, ConfigError> {
        schedule.validate()?;
        Ok(Self::build(schedule, timezone))
    }

    // Callers validate first, so every hour is 0-23 and the lookup never falls back.
    fn build(schedule: WorkScheduleConfig, timezone: TimeZoneConverter) -> Self {
        let at = |hour: u32| NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        Self {
            schedule,
            timezone,
            work_start: at(schedule.start_hour),
            work_end: at(schedule.end_hour),
            lunch_start: at(schedule.lunch_start_hour),
            lunch_end: at(schedule.lunch_end_hour),
        }
    }

    pub fn schedule(&self) -> &WorkScheduleConfig {
        &self.schedule
    }

    pub fn timezone(&self) -> &TimeZoneConverter {
        &self.timezone
    }

    pub fn work_start_time(&self) -> NaiveTime {
        self.work_start
    }

    pub fn work_end_time(&self) -> NaiveTime {
        self.work_end
    }

    pub fn lunch_start_time(&self) -> NaiveTime {
        self.lunch_start
    }

    pub fn lunch_end_time(&self) -> NaiveTime {
        self.lunch_end
    }

    pub fn is_working_date(&self, date: NaiveDate) -> bool {
        Self::WORKING_DAYS.contains(&date.weekday())
    }

    pub fn is_working_weekday(&self, local: NaiveDateTime) -> bool {
        self.is_working_date(local.date())
    }

    pub fn is_in_lunch(&self, local: NaiveDateTime) -> bool {
        let time = local.time();
        time >= self.lunch_start && time < self.lunch_end
    }

    pub fn is_in_work_window(&self, local: NaiveDateTime) -> bool {
        let time = local.time();
        time >= self.work_start && time < self.work_end && !self.is_in_lunch(local)
    }

    pub fn work_start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.work_start)
    }

    pub fn work_end_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.work_end)
    }

    pub fn lunch_start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.lunch_start)
    }

    pub fn lunch_end_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.lunch_end)
    }

    /// Weekend/holiday flags and the work/lunch boundaries of `local`'s calendar day.
    pub fn day_info(&self, local: NaiveDateTime, is_holiday: bool) -> BusinessDayInfo {
        let date = local.date();
        let is_weekend = !self.is_working_date(date);
        BusinessDayInfo {
            is_working_day: !is_weekend && !is_holiday,
            is_holiday,
            is_weekend,
            work_start: self.timezone.to_utc(self.work_start_on(date)),
            work_end: self.timezone.to_utc(self.work_end_on(date)),
            lunch_start: self.timezone.to_utc(self.lunch_start_on(date)),
            lunch_end: self.timezone.to_utc(self.lunch_end_on(date)),
        }
    }

    /// First Monday-Friday date strictly after `from`. `None` only at the end of chrono's range.
    pub fn next_working_weekday(&self, from: NaiveDate) -> Option<NaiveDate> {
        let mut current = from.succ_opt()?;
        while !self.is_working_date(current) {
            current = current.succ_opt()?;
        }
        Some(current)
    }

    /// Last Monday-Friday date strictly before `from`.
    pub fn prev_working_weekday(&self, from: NaiveDate) -> Option<NaiveDate> {
        let mut current = from.pred_opt()?;
        while !self.is_working_date(current) {
            current = current.pred_opt()?;
        }
        Some(current)
    }
}
