use chrono::{Duration, NaiveDate};
use gantt_solver::{
    Calendar, CalendarPeriod, Limit, Project, Resource, Scheduler, SolveOutcome, Task,
    WorkCalendar,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn plan_single(calendar: &Calendar, start_after: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    let project = Project::new(d(2026, 1, 1))
        .with_calendar(calendar.clone())
        .with_resource(Resource::new("ann", "dev"))
        .with_root(Task::leaf(
            "a",
            "A",
            Limit::with_duration(days)
                .role("dev")
                .start_after(start_after),
        ));
    let planned = match Scheduler::default().solve(&project).unwrap() {
        SolveOutcome::Planned { project, .. } => project,
        SolveOutcome::Unsolved(status) => panic!("unsolved from {start_after}: {status:?}"),
    };
    let plan = planned.task("a").unwrap().plan.clone().unwrap();
    (plan.start.unwrap(), plan.finish.unwrap())
}

// Every start offset in the first weeks, with a mid-week holiday block, must
// yield exactly `days` working days and end on a working day.
#[test]
fn elastic_span_counts_exactly_the_working_days() {
    let calendar = Calendar::new()
        .with_non_working(CalendarPeriod::new(d(2026, 1, 13), d(2026, 1, 14)))
        .with_working(CalendarPeriod::day(d(2026, 1, 24)));
    let engine = WorkCalendar::new(180, d(2026, 1, 1), Some(&calendar), None);

    for offset in 0..28 {
        let start_after = d(2026, 1, 1) + Duration::days(offset);
        for days in [1, 3, 6] {
            let (start, finish) = plan_single(&calendar, start_after, days);
            assert_eq!(start, start_after, "start for {start_after} x{days}");
            assert!(finish >= start);
            assert_eq!(
                engine.working_days_count(start, finish).unwrap(),
                days,
                "span {start}..{finish} for {start_after} x{days}"
            );
            assert!(engine.is_available(finish), "finish {finish} is a day off");
        }
    }
}
