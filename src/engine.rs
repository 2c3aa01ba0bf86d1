use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::calendar::ScheduleCalendar;
use crate::holidays::{HolidayCache, HolidayError, HolidaySet, HolidaySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidParameters,
    HolidayServiceError,
    CalculationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidParameters => "InvalidParameters",
            ErrorKind::HolidayServiceError => "HolidayServiceError",
            ErrorKind::CalculationError => "CalculationError",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error("{0}")]
    InvalidParameters(String),
    #[error("could not load holidays: {0}")]
    HolidayService(#[from] HolidayError),
    #[error("calculation failed: {0}")]
    Calculation(String),
}

impl CalculationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalculationError::InvalidParameters(_) => ErrorKind::InvalidParameters,
            CalculationError::HolidayService(_) => ErrorKind::HolidayServiceError,
            CalculationError::Calculation(_) => ErrorKind::CalculationError,
        }
    }

    fn out_of_range(what: &str) -> Self {
        CalculationError::Calculation(format!("{what} falls outside the supported date range"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Starting instant; `None` means now.
    pub anchor: Option<DateTime<Utc>>,
    pub days: Option<u32>,
    pub hours: Option<u32>,
}

impl CalculationRequest {
    /// Largest accepted `days`; roughly 140 years of working days.
    pub const MAX_DAYS: u32 = 36_500;
    /// Largest accepted `hours`; `MAX_DAYS` eight-hour days.
    pub const MAX_HOURS: u32 = 292_000;

    pub fn new(anchor: Option<DateTime<Utc>>, days: Option<u32>, hours: Option<u32>) -> Self {
        Self {
            anchor,
            days,
            hours,
        }
    }

    fn validate(&self) -> Result<(), CalculationError> {
        if self.days.is_none() && self.hours.is_none() {
            return Err(CalculationError::InvalidParameters(
                "at least one of 'days' or 'hours' is required".to_string(),
            ));
        }
        let limits = [
            ("days", self.days, Self::MAX_DAYS),
            ("hours", self.hours, Self::MAX_HOURS),
        ];
        for (field, value, max) in limits {
            if let Some(value) = value.filter(|value| *value > max) {
                return Err(CalculationError::InvalidParameters(format!(
                    "'{field}' must be at most {max} (got {value})"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalculationOutcome {
    pub result: DateTime<Utc>,
    pub original_anchor: DateTime<Utc>,
    pub added_days: u32,
    pub added_hours: u32,
}

pub type CalculationResult = Result<CalculationOutcome, CalculationError>;

/// Adds business days and hours to an instant on a [`ScheduleCalendar`].
///
/// The holiday set is read once per calculation from the shared [`HolidayCache`]. The
/// arithmetic itself is synchronous and works on local wall-clock time.
pub struct BusinessDateEngine<S> {
    calendar: ScheduleCalendar,
    holidays: Arc<HolidayCache<S>>,
}

impl<S: HolidaySource> BusinessDateEngine<S> {
    /// Upper bound on steps taken while normalizing backwards. Each candidate instant checked
    /// and each holiday skipped on a working weekday counts as one step; weekend days the
    /// walk passes over are not counted.
    pub const MAX_NORMALIZE_DAYS: u32 = 3_660;

    pub fn new(calendar: ScheduleCalendar, holidays: Arc<HolidayCache<S>>) -> Self {
        Self { calendar, holidays }
    }

    pub fn calendar(&self) -> &ScheduleCalendar {
        &self.calendar
    }

    pub fn holiday_cache(&self) -> &Arc<HolidayCache<S>> {
        &self.holidays
    }

    /// Fetches the holiday set and runs the calculation. A holiday failure aborts before any
    /// arithmetic; no stale set is substituted.
    pub async fn calculate(&self, request: &CalculationRequest) -> CalculationResult {
        let outcome = self.try_calculate(request).await;
        if let Err(err) = &outcome {
            warn!(kind = err.kind().as_str(), error = %err, "calculation failed");
        }
        outcome
    }

    async fn try_calculate(&self, request: &CalculationRequest) -> CalculationResult {
        request.validate()?;
        let holidays = self.holidays.get_holidays().await?;
        self.calculate_with(request, &holidays, Utc::now())
    }

    /// Runs the arithmetic against an explicit holiday set; `now` stands in for a missing anchor.
    pub fn calculate_with(
        &self,
        request: &CalculationRequest,
        holidays: &HolidaySet,
        now: DateTime<Utc>,
    ) -> CalculationResult {
        request.validate()?;
        let anchor = request.anchor.unwrap_or(now);
        let days = request.days.unwrap_or(0);
        let hours = request.hours.unwrap_or(0);

        let tz = self.calendar.timezone();
        let mut current = self.normalize_local(tz.to_local(anchor), holidays)?;
        debug!(%anchor, normalized = %current, "anchor normalized");

        if days > 0 {
            current = self.add_days_local(current, days, holidays)?;
            debug!(days, after_days = %current, "business days added");
        }
        if hours > 0 {
            current = self.add_hours_local(current, hours, holidays)?;
            debug!(hours, after_hours = %current, "business hours added");
        }

        Ok(CalculationOutcome {
            result: tz.to_utc(current),
            original_anchor: anchor,
            added_days: days,
            added_hours: hours,
        })
    }

    /// Moves `anchor` back onto the work calendar. See [`Self::normalize_local`].
    pub fn normalize(
        &self,
        anchor: DateTime<Utc>,
        holidays: &HolidaySet,
    ) -> Result<DateTime<Utc>, CalculationError> {
        let tz = self.calendar.timezone();
        Ok(tz.to_utc(self.normalize_local(tz.to_local(anchor), holidays)?))
    }

    /// Snaps a local instant to the latest point of business time at or before it.
    ///
    /// Weekends and holidays fall back to the previous working day's end, instants before
    /// the work window fall back to the previous day's end, instants after it snap to today's
    /// end and instants inside lunch snap to the start of lunch.
    pub fn normalize_local(
        &self,
        local: NaiveDateTime,
        holidays: &HolidaySet,
    ) -> Result<NaiveDateTime, CalculationError> {
        let cal = &self.calendar;
        let tz = cal.timezone();
        let mut candidate = local;
        let mut steps = 0u32;
        let mut step = || {
            steps += 1;
            if steps > Self::MAX_NORMALIZE_DAYS {
                return Err(CalculationError::Calculation(format!(
                    "no working day found within {} steps before {local}",
                    Self::MAX_NORMALIZE_DAYS
                )));
            }
            Ok(())
        };

        loop {
            step()?;
            let date = candidate.date();
            let info = cal.day_info(candidate, holidays.contains(date));
            let instant = tz.to_utc(candidate);

            if info.is_weekend || info.is_holiday {
                let mut day = date;
                loop {
                    day = cal
                        .prev_working_weekday(day)
                        .ok_or_else(|| CalculationError::out_of_range("normalized anchor"))?;
                    if !holidays.contains(day) {
                        return Ok(cal.work_end_on(day));
                    }
                    step()?;
                }
            }

            if instant < info.work_start {
                let previous = date
                    .pred_opt()
                    .ok_or_else(|| CalculationError::out_of_range("normalized anchor"))?;
                candidate = cal.work_end_on(previous);
                continue;
            }

            if instant > info.work_end {
                return Ok(tz.to_local(info.work_end));
            }

            if cal.is_in_lunch(candidate) {
                return Ok(tz.to_local(info.lunch_start));
            }

            return Ok(candidate);
        }
    }

    /// Advances `local` by whole working days, keeping its wall-clock time.
    ///
    /// Holidays on working weekdays are stepped over without being counted.
    pub fn add_days_local(
        &self,
        local: NaiveDateTime,
        days: u32,
        holidays: &HolidaySet,
    ) -> Result<NaiveDateTime, CalculationError> {
        let time = local.time();
        let mut date = local.date();
        let mut added = 0u32;

        while added < days {
            date = self.next_working_weekday(date)?;
            if !holidays.contains(date) {
                added += 1;
            }
        }
        Ok(date.and_time(time))
    }

    /// Advances `local` by business hours, skipping lunch, evenings, weekends and holidays.
    ///
    /// Partial hours carry over exactly between work blocks.
    pub fn add_hours_local(
        &self,
        local: NaiveDateTime,
        hours: u32,
        holidays: &HolidaySet,
    ) -> Result<NaiveDateTime, CalculationError> {
        let cal = &self.calendar;
        let mut current = local;
        let mut remaining = TimeDelta::hours(i64::from(hours));

        while remaining > TimeDelta::zero() {
            let date = current.date();
            let time = current.time();

            if !cal.is_working_date(date) || holidays.contains(date) || time >= cal.work_end_time()
            {
                current = cal.work_start_on(self.next_working_weekday(date)?);
                continue;
            }
            if time < cal.work_start_time() {
                current = cal.work_start_on(date);
                continue;
            }
            if cal.is_in_lunch(current) {
                current = cal.lunch_end_on(date);
                continue;
            }

            let block_end = if time < cal.lunch_start_time() {
                cal.lunch_start_on(date)
            } else {
                cal.work_end_on(date)
            };
            let available = block_end - current;

            if available >= remaining {
                current = current
                    .checked_add_signed(remaining)
                    .ok_or_else(|| CalculationError::out_of_range("result"))?;
                remaining = TimeDelta::zero();
            } else {
                current = block_end;
                remaining -= available;
            }
        }
        Ok(current)
    }

    fn next_working_weekday(&self, date: NaiveDate) -> Result<NaiveDate, CalculationError> {
        self.calendar
            .next_working_weekday(date)
            .ok_or_else(|| CalculationError::out_of_range("next working day"))
    }
}
