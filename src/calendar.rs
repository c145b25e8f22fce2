use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl CalendarPeriod {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Calendar overrides layered on top of the Mon-Fri week.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_working: Vec<CalendarPeriod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub working: Vec<CalendarPeriod>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_non_working(mut self, period: CalendarPeriod) -> Self {
        self.non_working.push(period);
        self
    }

    pub fn with_working(mut self, period: CalendarPeriod) -> Self {
        self.working.push(period);
        self
    }

    fn closes(&self, date: NaiveDate) -> bool {
        self.non_working.iter().any(|p| p.contains(date))
    }

    fn opens(&self, date: NaiveDate) -> bool {
        self.working.iter().any(|p| p.contains(date))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("date {date} is outside the calendar range {start}..{end}")]
    OutOfRange {
        date: NaiveDate,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Working-day map over a fixed horizon starting at the project start.
#[derive(Debug, Clone)]
pub struct WorkCalendar {
    start: NaiveDate,
    days: Vec<bool>,
}

impl WorkCalendar {
    /// Layers, lowest precedence first: weekends off, global non-working,
    /// global working, resource non-working, resource working.
    pub fn new(
        horizon: usize,
        start: NaiveDate,
        global: Option<&Calendar>,
        resource: Option<&Calendar>,
    ) -> Self {
        let days = start
            .iter_days()
            .take(horizon)
            .map(|date| {
                let mut working = !matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
                for layer in [global, resource].into_iter().flatten() {
                    if working && layer.closes(date) {
                        working = false;
                    }
                    if !working && layer.opens(date) {
                        working = true;
                    }
                }
                working
            })
            .collect();
        Self { start, days }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn horizon(&self) -> usize {
        self.days.len()
    }

    /// First date past the horizon.
    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.days.len() as i64)
    }

    pub fn is_working(&self, offset: i64) -> bool {
        usize::try_from(offset)
            .ok()
            .and_then(|idx| self.days.get(idx))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_available(&self, date: NaiveDate) -> bool {
        self.is_working(self.offset_of(date))
    }

    pub fn offset_of(&self, date: NaiveDate) -> i64 {
        (date - self.start).num_days()
    }

    pub fn date_at(&self, offset: i64) -> NaiveDate {
        self.start + Duration::days(offset)
    }

    /// Working days in `[from, to]`, both ends inclusive.
    pub fn working_days_count(&self, from: NaiveDate, to: NaiveDate) -> Result<i64, CalendarError> {
        for date in [from, to] {
            if date < self.start || date >= self.end() {
                return Err(CalendarError::OutOfRange {
                    date,
                    start: self.start,
                    end: self.end(),
                });
            }
        }
        if from > to {
            return Ok(0);
        }
        let (lo, hi) = (self.offset_of(from), self.offset_of(to));
        Ok((lo..=hi).filter(|&offset| self.is_working(offset)).count() as i64)
    }

    pub fn non_working_offsets(&self) -> Vec<i64> {
        self.days
            .iter()
            .enumerate()
            .filter(|(_, working)| !**working)
            .map(|(offset, _)| offset as i64)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn weekends_are_off_by_default() {
        // 2026-01-03 is a Saturday.
        let calendar = WorkCalendar::new(14, d(2026, 1, 1), None, None);
        assert_eq!(calendar.non_working_offsets(), vec![2, 3, 9, 10]);
        assert!(!calendar.is_working(-1));
        assert!(!calendar.is_working(14));
    }

    #[test]
    fn resource_working_beats_global_non_working() {
        let global = Calendar::new().with_non_working(CalendarPeriod::day(d(2026, 1, 5)));
        let personal = Calendar::new().with_working(CalendarPeriod::day(d(2026, 1, 5)));
        let calendar = WorkCalendar::new(14, d(2026, 1, 1), Some(&global), Some(&personal));
        assert!(calendar.is_available(d(2026, 1, 5)));
    }
}
