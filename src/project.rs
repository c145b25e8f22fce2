use crate::calendar::Calendar;
use crate::resource::Resource;
use crate::task::Task;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The unit handed to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub start: NaiveDate,
    /// Snapshot date for progress bookkeeping; never before `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_date: Option<NaiveDate>,
    #[serde(default)]
    pub root: Option<Task>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar: Option<Calendar>,
}

impl Project {
    pub fn new(start: NaiveDate) -> Self {
        Self {
            start,
            fact_date: None,
            root: None,
            resources: Vec::new(),
            calendar: None,
        }
    }

    pub fn with_root(mut self, root: Task) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_fact_date(mut self, date: NaiveDate) -> Self {
        self.fact_date = Some(date);
        self
    }

    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.root.as_ref().and_then(|root| root.find(id))
    }
}
