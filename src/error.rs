use crate::calendar::CalendarError;
use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;

/// Everything that can stop a solve before or after the solver runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("invalid scheduler configuration: {0}")]
    InvalidConfig(String),
    #[error("project has no root task")]
    MissingRoot,
    #[error("fact date {fact_date} is before project start {start}")]
    FactDateBeforeStart {
        start: NaiveDate,
        fact_date: NaiveDate,
    },
    #[error("task must have a non-empty id")]
    MissingId,
    #[error("task with id {0} already exists")]
    DuplicateId(String),
    #[error("leaf task {0} has no limit")]
    MissingLimit(String),
    #[error("limit of task {task} is invalid: {reason}")]
    InvalidLimit { task: String, reason: String },
    #[error("priority {priority} of task {task} has no weight")]
    InvalidPriority { task: String, priority: u8 },
    #[error("no tasks left to schedule")]
    EmptyProject,
    #[error("task {task} depends on unknown task {predecessor}")]
    UnknownPredecessor { task: String, predecessor: String },
    #[error("dependency cycle through task {0}")]
    DependencyCycle(String),
    #[error("task {task} refers to unknown resource {resource}")]
    UnknownResource { task: String, resource: String },
    #[error("no resource can perform task {task} (role {role:?})")]
    NoEligibleResource { task: String, role: Option<String> },
    #[error("resource {resource} has invalid efficiency {efficiency}")]
    InvalidEfficiency { resource: String, efficiency: i64 },
    #[error("resource {0} is declared twice")]
    DuplicateResource(String),
    #[error("can't find resource for task {0}")]
    ResourceResolution(String),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}
