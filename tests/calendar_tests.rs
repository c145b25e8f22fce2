use chrono::{Datelike, NaiveDate, Weekday};
use gantt_solver::calendar::{Calendar, CalendarError, CalendarPeriod, WorkCalendar};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn default_calendar_weekends_unavailable() {
    let cal = WorkCalendar::new(30, d(2026, 1, 1), None, None);
    // 2026-01-03 is a Saturday, 2026-01-04 is a Sunday
    assert_eq!(d(2026, 1, 3).weekday(), Weekday::Sat);
    assert!(!cal.is_available(d(2026, 1, 3)));
    assert!(!cal.is_available(d(2026, 1, 4)));
    assert!(cal.is_available(d(2026, 1, 5)));
}

#[test]
fn working_days_count_is_inclusive() {
    let cal = WorkCalendar::new(30, d(2026, 1, 1), None, None);
    assert_eq!(cal.working_days_count(d(2026, 1, 1), d(2026, 1, 7)), Ok(5));
    assert_eq!(cal.working_days_count(d(2026, 1, 5), d(2026, 1, 5)), Ok(1));
    assert_eq!(cal.working_days_count(d(2026, 1, 3), d(2026, 1, 4)), Ok(0));
}

#[test]
fn working_days_count_is_zero_for_reversed_range() {
    let cal = WorkCalendar::new(30, d(2026, 1, 1), None, None);
    assert_eq!(cal.working_days_count(d(2026, 1, 9), d(2026, 1, 5)), Ok(0));
}

#[test]
fn working_days_count_rejects_dates_outside_horizon() {
    let cal = WorkCalendar::new(30, d(2026, 1, 1), None, None);
    assert_eq!(cal.end(), d(2026, 1, 31));
    let err = cal
        .working_days_count(d(2026, 1, 2), d(2026, 1, 31))
        .unwrap_err();
    assert_eq!(
        err,
        CalendarError::OutOfRange {
            date: d(2026, 1, 31),
            start: d(2026, 1, 1),
            end: d(2026, 1, 31),
        }
    );
    assert!(
        cal.working_days_count(d(2025, 12, 31), d(2026, 1, 2))
            .is_err()
    );
}

#[test]
fn global_overrides_close_and_reopen_days() {
    let global = Calendar::new()
        .with_non_working(CalendarPeriod::new(d(2026, 1, 5), d(2026, 1, 6)))
        .with_working(CalendarPeriod::day(d(2026, 1, 3)));
    let cal = WorkCalendar::new(14, d(2026, 1, 1), Some(&global), None);
    assert!(cal.is_available(d(2026, 1, 3)));
    assert!(!cal.is_available(d(2026, 1, 5)));
    assert!(!cal.is_available(d(2026, 1, 6)));
    assert_eq!(cal.non_working_offsets(), vec![3, 4, 5, 9, 10]);
}

#[test]
fn resource_working_day_reopens_only_for_that_resource() {
    let global = Calendar::new().with_non_working(CalendarPeriod::day(d(2026, 1, 2)));
    let personal = Calendar::new().with_working(CalendarPeriod::day(d(2026, 1, 2)));
    let shared = WorkCalendar::new(14, d(2026, 1, 1), Some(&global), None);
    let own = WorkCalendar::new(14, d(2026, 1, 1), Some(&global), Some(&personal));
    assert!(!shared.is_available(d(2026, 1, 2)));
    assert!(own.is_available(d(2026, 1, 2)));
}

#[test]
fn resource_non_working_days_close_weekdays() {
    let personal = Calendar::new().with_non_working(CalendarPeriod::new(d(2026, 1, 12), d(2026, 1, 16)));
    let cal = WorkCalendar::new(30, d(2026, 1, 1), None, Some(&personal));
    assert_eq!(cal.working_days_count(d(2026, 1, 12), d(2026, 1, 18)), Ok(0));
}

#[test]
fn offsets_and_dates_convert_both_ways() {
    let cal = WorkCalendar::new(30, d(2026, 1, 1), None, None);
    assert_eq!(cal.offset_of(d(2026, 1, 15)), 14);
    assert_eq!(cal.date_at(14), d(2026, 1, 15));
    assert_eq!(cal.offset_of(d(2025, 12, 31)), -1);
    assert!(!cal.is_available(d(2025, 12, 31)));
}
