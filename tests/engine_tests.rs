use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use business_dates::{
    BusinessDateEngine, CalculationError, CalculationRequest, ErrorKind, HolidayCache,
    HolidayError, HolidaySet, HolidaySource, ScheduleCalendar, StaticHolidaySource,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use serde_json::Value;

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn engine_with(dates: &[&str]) -> BusinessDateEngine<StaticHolidaySource> {
    let cache = HolidayCache::new(
        StaticHolidaySource::new(dates.iter().copied()),
        Duration::minutes(60),
    );
    BusinessDateEngine::new(ScheduleCalendar::default(), Arc::new(cache))
}

fn set(dates: &[NaiveDate]) -> HolidaySet {
    dates.iter().copied().collect()
}

fn run(
    engine: &BusinessDateEngine<StaticHolidaySource>,
    holidays: &HolidaySet,
    anchor: &str,
    days: Option<u32>,
    hours: Option<u32>,
) -> DateTime<Utc> {
    let request = CalculationRequest::new(Some(utc(anchor)), days, hours);
    engine
        .calculate_with(&request, holidays, Utc::now())
        .unwrap()
        .result
}

#[test]
fn friday_end_of_day_plus_one_hour_lands_monday_morning() {
    let engine = engine_with(&[]);
    let result = run(&engine, &HolidaySet::default(), "2025-01-03T22:00:00Z", None, Some(1));
    assert_eq!(result, utc("2025-01-06T14:00:00Z"));
    let local = engine.calendar().timezone().to_local(result);
    assert_eq!(local.weekday(), Weekday::Mon);
    assert_eq!(local.hour(), 9);
}

#[test]
fn saturday_afternoon_plus_one_hour_lands_monday_morning() {
    let engine = engine_with(&[]);
    let result = run(&engine, &HolidaySet::default(), "2025-01-04T19:00:00Z", None, Some(1));
    assert_eq!(result, utc("2025-01-06T14:00:00Z"));
}

#[test]
fn tuesday_afternoon_plus_one_day_and_four_hours_lands_thursday() {
    let engine = engine_with(&[]);
    let result = run(&engine, &HolidaySet::default(), "2025-01-07T20:00:00Z", Some(1), Some(4));
    assert_eq!(result, utc("2025-01-09T15:00:00Z"));
}

#[test]
fn eight_hours_from_start_of_day_ends_same_day_after_lunch() {
    let engine = engine_with(&[]);
    let result = run(&engine, &HolidaySet::default(), "2025-01-06T13:00:00Z", None, Some(8));
    assert_eq!(result, utc("2025-01-06T22:00:00Z"));
}

#[test]
fn sunday_evening_plus_one_day_lands_monday_end_of_day() {
    let engine = engine_with(&[]);
    let result = run(&engine, &HolidaySet::default(), "2025-01-05T23:00:00Z", Some(1), None);
    assert_eq!(result, utc("2025-01-06T22:00:00Z"));
}

#[test]
fn start_of_day_plus_one_day_keeps_time_of_day() {
    let engine = engine_with(&[]);
    let result = run(&engine, &HolidaySet::default(), "2025-01-06T13:00:00Z", Some(1), None);
    assert_eq!(result, utc("2025-01-07T13:00:00Z"));
}

#[test]
fn holidays_are_skipped_when_counting_days() {
    let engine = engine_with(&[]);
    let holidays = set(&[d(2025, 4, 17), d(2025, 4, 18)]);

    // Thursday 15:00 local + 5 days + 4 hours.
    let result = run(&engine, &holidays, "2025-04-10T20:00:00Z", Some(5), Some(4));
    assert_eq!(result, utc("2025-04-22T15:00:00Z"));

    // Thursday 10:00 local + 5 days + 4 hours.
    let result = run(&engine, &holidays, "2025-04-10T15:00:00Z", Some(5), Some(4));
    assert_eq!(result, utc("2025-04-21T20:00:00Z"));
}

#[test]
fn hours_roll_over_holidays() {
    let engine = engine_with(&[]);
    let holidays = set(&[d(2025, 4, 17), d(2025, 4, 18)]);
    // Wednesday 16:00 local + 2h: one hour today, one hour on Monday.
    let result = run(&engine, &holidays, "2025-04-16T21:00:00Z", None, Some(2));
    assert_eq!(result, utc("2025-04-21T14:00:00Z"));
}

#[test]
fn partial_hours_carry_across_lunch_and_evenings() {
    let engine = engine_with(&[]);
    let none = HolidaySet::default();
    // Tuesday 10:30 local + 2h -> 13:30 local.
    assert_eq!(
        run(&engine, &none, "2025-01-07T15:30:00Z", None, Some(2)),
        utc("2025-01-07T18:30:00Z")
    );
    // Tuesday 16:30 local + 1h -> Wednesday 08:30 local.
    assert_eq!(
        run(&engine, &none, "2025-01-07T21:30:00Z", None, Some(1)),
        utc("2025-01-08T13:30:00Z")
    );
}

#[test]
fn lunch_anchor_snaps_back_before_adding_days() {
    let engine = engine_with(&[]);
    // Monday 12:30 local + 1 day -> Tuesday 12:00 local.
    assert_eq!(
        run(&engine, &HolidaySet::default(), "2025-01-06T17:30:00Z", Some(1), None),
        utc("2025-01-07T17:00:00Z")
    );
}

#[test]
fn morning_hours_continue_after_lunch_on_the_same_day() {
    let engine = engine_with(&[]);
    // Monday 11:30 local + 3h -> 12:00, then 13:00 + 2.5h -> 15:30 local.
    assert_eq!(
        run(&engine, &HolidaySet::default(), "2025-01-06T16:30:00Z", None, Some(3)),
        utc("2025-01-06T20:30:00Z")
    );
}

#[test]
fn normalization_inside_work_window_is_a_no_op() {
    let engine = engine_with(&[]);
    let none = HolidaySet::default();
    for anchor in [
        "2025-01-07T13:00:00Z",
        "2025-01-07T15:45:10Z",
        "2025-01-07T16:59:59Z",
        "2025-01-07T18:00:00Z",
        "2025-01-07T21:59:00Z",
    ] {
        assert_eq!(engine.normalize(utc(anchor), &none).unwrap(), utc(anchor));
    }
}

#[test]
fn normalization_snaps_to_previous_business_time() {
    let engine = engine_with(&[]);
    let none = HolidaySet::default();
    // Lunch snaps back to lunch start.
    assert_eq!(
        engine.normalize(utc("2025-01-07T17:30:00Z"), &none).unwrap(),
        utc("2025-01-07T17:00:00Z")
    );
    // After hours snaps to today's end.
    assert_eq!(
        engine.normalize(utc("2025-01-08T00:00:00Z"), &none).unwrap(),
        utc("2025-01-07T22:00:00Z")
    );
    // Before hours falls back to the previous day's end.
    assert_eq!(
        engine.normalize(utc("2025-01-07T12:00:00Z"), &none).unwrap(),
        utc("2025-01-06T22:00:00Z")
    );
    // Monday before hours falls back over the weekend.
    assert_eq!(
        engine.normalize(utc("2025-01-06T12:00:00Z"), &none).unwrap(),
        utc("2025-01-03T22:00:00Z")
    );
}

#[test]
fn normalization_walks_back_over_consecutive_holidays() {
    let engine = engine_with(&[]);
    let holidays = set(&[d(2025, 4, 17), d(2025, 4, 18)]);
    // Holiday Thursday -> Wednesday end of day.
    assert_eq!(
        engine.normalize(utc("2025-04-17T15:00:00Z"), &holidays).unwrap(),
        utc("2025-04-16T22:00:00Z")
    );
    // Monday before hours -> weekend -> Friday and Thursday holidays -> Wednesday.
    assert_eq!(
        engine.normalize(utc("2025-04-21T12:00:00Z"), &holidays).unwrap(),
        utc("2025-04-16T22:00:00Z")
    );
}

#[test]
fn endless_holiday_run_is_reported_instead_of_looping() {
    let engine = engine_with(&[]);
    let start = d(2005, 1, 1);
    let holidays: HolidaySet = start.iter_days().take_while(|day| *day <= d(2025, 6, 30)).collect();
    let request = CalculationRequest::new(Some(utc("2025-06-28T15:00:00Z")), None, Some(1));
    let err = engine
        .calculate_with(&request, &holidays, Utc::now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CalculationError);
}

#[test]
fn zero_days_and_hours_returns_normalized_anchor() {
    let engine = engine_with(&[]);
    let result = run(&engine, &HolidaySet::default(), "2025-01-04T19:00:00Z", Some(0), Some(0));
    assert_eq!(result, utc("2025-01-03T22:00:00Z"));
}

#[test]
fn outcome_echoes_request() {
    let engine = engine_with(&[]);
    let now = utc("2025-01-07T20:00:00Z");
    let outcome = engine
        .calculate_with(&CalculationRequest::new(None, None, Some(3)), &HolidaySet::default(), now)
        .unwrap();
    assert_eq!(outcome.original_anchor, now);
    assert_eq!(outcome.added_days, 0);
    assert_eq!(outcome.added_hours, 3);
    assert_eq!(outcome.result, utc("2025-01-08T14:00:00Z"));
}

#[test]
fn missing_days_and_hours_is_invalid() {
    let engine = engine_with(&[]);
    let err = engine
        .calculate_with(&CalculationRequest::default(), &HolidaySet::default(), Utc::now())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameters);
}

#[test]
fn oversized_counts_are_rejected_without_walking_the_calendar() {
    let engine = engine_with(&[]);
    let anchor = Some(utc("2025-01-07T15:00:00Z"));
    for request in [
        CalculationRequest::new(anchor, None, Some(u32::MAX)),
        CalculationRequest::new(anchor, Some(u32::MAX), None),
        CalculationRequest::new(anchor, Some(CalculationRequest::MAX_DAYS + 1), Some(1)),
        CalculationRequest::new(anchor, None, Some(CalculationRequest::MAX_HOURS + 1)),
    ] {
        let started = Instant::now();
        let err = engine
            .calculate_with(&request, &HolidaySet::default(), Utc::now())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameters, "{request:?}");
        assert!(started.elapsed() < StdDuration::from_millis(100), "{request:?}");
    }
}

#[test]
fn largest_accepted_counts_still_compute() {
    let engine = engine_with(&[]);
    let none = HolidaySet::default();
    let anchor = "2025-01-07T15:00:00Z";
    let by_days = run(&engine, &none, anchor, Some(CalculationRequest::MAX_DAYS), None);
    let by_hours = run(&engine, &none, anchor, None, Some(CalculationRequest::MAX_HOURS));
    // Eight business hours from 10:00 is 10:00 on the next working day.
    assert_eq!(by_days, by_hours);
    assert!(by_days.year() > 2150);
}

#[test]
fn results_always_land_on_working_non_holiday_days() {
    let engine = engine_with(&[]);
    let holidays = set(&[d(2025, 4, 17), d(2025, 4, 18), d(2025, 5, 1)]);
    let tz = *engine.calendar().timezone();
    let mut anchor = utc("2025-04-12T00:00:00Z");
    let end = utc("2025-04-26T00:00:00Z");

    while anchor < end {
        let mut previous = None;
        for days in 0..4 {
            for hours in 0..12 {
                let request = CalculationRequest::new(Some(anchor), Some(days), Some(hours));
                let result = engine
                    .calculate_with(&request, &holidays, Utc::now())
                    .unwrap()
                    .result;
                let local = tz.to_local(result);
                assert!(
                    !matches!(local.weekday(), Weekday::Sat | Weekday::Sun),
                    "{anchor} +{days}d +{hours}h landed on a weekend: {local}"
                );
                assert!(!holidays.contains(local.date()), "landed on a holiday: {local}");
                if days == 0 {
                    // Monotonic in hours.
                    if let Some(prev) = previous {
                        assert!(result >= prev, "{anchor} +{hours}h went backwards");
                    }
                    previous = Some(result);
                }
            }
        }
        anchor += Duration::minutes(173);
    }
}

#[test]
fn results_are_monotonic_in_days() {
    let engine = engine_with(&[]);
    let holidays = set(&[d(2025, 4, 17), d(2025, 4, 18)]);
    let anchor = Some(utc("2025-04-14T16:20:00Z"));
    let mut previous = None;
    for days in 0..15 {
        let request = CalculationRequest::new(anchor, Some(days), Some(2));
        let result = engine
            .calculate_with(&request, &holidays, Utc::now())
            .unwrap()
            .result;
        if let Some(prev) = previous {
            assert!(result > prev);
        }
        previous = Some(result);
    }
}

struct UnreachableSource;

impl HolidaySource for UnreachableSource {
    async fn fetch(&self) -> Result<Value, HolidayError> {
        Err(HolidayError::Network {
            status: Some(502),
            url: "http://holidays.invalid/list.json".to_string(),
            message: "HTTP 502 Bad Gateway".to_string(),
        })
    }

    fn describe(&self) -> String {
        "unreachable".to_string()
    }
}

#[tokio::test]
async fn calculate_fetches_holidays_through_the_cache() {
    let engine = engine_with(&["2025-04-17", "2025-04-18"]);
    let request = CalculationRequest::new(Some(utc("2025-04-10T20:00:00Z")), Some(5), Some(4));
    let outcome = engine.calculate(&request).await.unwrap();
    assert_eq!(outcome.result, utc("2025-04-22T15:00:00Z"));
    assert!(engine.holiday_cache().cache_info().has_cache);
}

#[tokio::test]
async fn holiday_failure_aborts_calculation() {
    let cache = HolidayCache::new(UnreachableSource, Duration::minutes(60));
    let engine = BusinessDateEngine::new(ScheduleCalendar::default(), Arc::new(cache));
    let request = CalculationRequest::new(Some(utc("2025-01-07T20:00:00Z")), None, Some(1));
    let err = engine.calculate(&request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HolidayServiceError);
    match err {
        CalculationError::HolidayService(inner) => assert_eq!(inner.status_code(), Some(502)),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn invalid_request_is_rejected_before_fetching() {
    let cache = HolidayCache::new(UnreachableSource, Duration::minutes(60));
    let engine = BusinessDateEngine::new(ScheduleCalendar::default(), Arc::new(cache));
    let err = engine
        .calculate(&CalculationRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParameters);
}
