pub mod calendar;
pub mod config;
pub mod cp;
pub mod error;
pub mod fact;
pub mod graph;
pub mod persistence;
pub mod project;
pub mod resource;
pub mod schedule;
pub mod task;

pub use calendar::{Calendar, CalendarError, CalendarPeriod, WorkCalendar};
pub use config::SchedulerConfig;
pub use cp::SolveStatus;
pub use error::{Result, ScheduleError};
pub use fact::{Fact, FactKind, FactRecord};
pub use persistence::{
    JsonFileStore, PersistenceError, ProjectStore, load_project_from_json, load_project_from_str,
    save_project_to_json, save_project_to_string,
};
pub use project::Project;
pub use resource::Resource;
pub use schedule::{Scheduler, SolveOutcome};
pub use task::{Limit, Plan, SizeBucket, Task, WorkType};
