use crate::calendar::Calendar;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn default_efficiency() -> i64 {
    100
}

/// A person (or crew) able to work on one task at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(default)]
    pub role: String,
    /// First day the resource can work, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avail_from: Option<NaiveDate>,
    /// Last day the resource can work, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avail_to: Option<NaiveDate>,
    /// Throughput in percent; 50 doubles every duration.
    #[serde(default = "default_efficiency")]
    pub efficiency: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<Calendar>,
    /// Estimation confidence used for size buckets, 0 to 100.
    #[serde(default)]
    pub confidence: i64,
}

impl Resource {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            avail_from: None,
            avail_to: None,
            efficiency: default_efficiency(),
            calendar: None,
            confidence: 0,
        }
    }

    pub fn available_from(mut self, date: NaiveDate) -> Self {
        self.avail_from = Some(date);
        self
    }

    pub fn available_to(mut self, date: NaiveDate) -> Self {
        self.avail_to = Some(date);
        self
    }

    pub fn with_efficiency(mut self, efficiency: i64) -> Self {
        self.efficiency = efficiency;
        self
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_confidence(mut self, confidence: i64) -> Self {
        self.confidence = confidence;
        self
    }
}
