use crate::fact::Fact;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// T-shirt estimate. Each bucket spans a range of days; the estimation
/// confidence picks a point inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeBucket {
    XS,
    S,
    M,
    L,
    XL,
}

impl SizeBucket {
    /// Inclusive `(min, max)` days.
    pub fn range(self) -> (i64, i64) {
        match self {
            SizeBucket::XS => (1, 1),
            SizeBucket::S => (2, 3),
            SizeBucket::M => (4, 7),
            SizeBucket::L => (8, 15),
            SizeBucket::XL => (16, 25),
        }
    }

    /// 100% confidence yields the lower bound, 0% the upper one.
    pub fn days(self, confidence: i64) -> i64 {
        let (min, max) = self.range();
        let confidence = confidence.clamp(0, 100);
        min + ((max - min) * (100 - confidence) + 50) / 100
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    Business,
    Team,
    Other,
}

/// Scheduling constraints of a leaf task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeBucket>,
    /// Estimation confidence in percent for `size`; falls back to the
    /// resource's confidence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_role: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub predecessors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_after: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
}

impl Limit {
    pub fn with_duration(duration: i64) -> Self {
        Self {
            duration: Some(duration),
            ..Self::default()
        }
    }

    pub fn with_size(size: SizeBucket) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.resource_role = Some(role.into());
        self
    }

    pub fn resource(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    pub fn after<I, S>(mut self, predecessors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predecessors
            .extend(predecessors.into_iter().map(Into::into));
        self
    }

    pub fn buffer(mut self, days: i64) -> Self {
        self.buffer = Some(days);
        self
    }

    pub fn confidence(mut self, percent: i64) -> Self {
        self.confidence = Some(percent);
        self
    }

    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn start_after(mut self, date: NaiveDate) -> Self {
        self.start_after = Some(date);
        self
    }

    pub fn due(mut self, date: NaiveDate) -> Self {
        self.due_date = Some(date);
        self
    }

    /// Checks the shape of the limit; the error is a human-readable reason.
    pub fn validate(&self) -> Result<(), String> {
        match (self.duration, self.size) {
            (None, None) => return Err("either duration or size is required".into()),
            (Some(days), _) if days <= 0 => {
                return Err(format!("duration must be positive (got {days})"));
            }
            _ => {}
        }
        if let Some(buffer) = self.buffer.filter(|b| *b < 0) {
            return Err(format!("buffer must not be negative (got {buffer})"));
        }
        let named = self
            .resource_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        let role = self
            .resource_role
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if named && role {
            return Err("resource name and role are mutually exclusive".into());
        }
        if let (Some(after), Some(due)) = (self.start_after, self.due_date) {
            if after > due {
                return Err(format!("start-after {after} is later than due date {due}"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish: Option<NaiveDate>,
}

/// Node of the project tree: a group when it has children, a leaf otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default, skip_serializing_if = "Fact::is_empty")]
    pub fact: Fact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_type: Option<WorkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub okr: Option<bool>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Task>,
}

impl Task {
    pub fn leaf(id: impl Into<String>, name: impl Into<String>, limit: Limit) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn group<I>(id: impl Into<String>, name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = Task>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            children: children.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_work_type(mut self, work_type: WorkType) -> Self {
        self.work_type = Some(work_type);
        self
    }

    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.fact = fact;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn is_group(&self) -> bool {
        !self.children.is_empty()
    }

    /// Priority used for the objective: the limit's own, else the task's.
    pub fn effective_priority(&self) -> Option<u8> {
        self.limit
            .as_ref()
            .and_then(|limit| limit.priority)
            .or(self.priority)
    }

    /// A task needs no variables when it is disabled, paused or finished.
    pub fn can_skip(&self) -> bool {
        self.disabled || self.fact.is_paused() || self.fact.is_finished()
    }

    /// Depth-first search by id, the node itself included.
    pub fn find(&self, id: &str) -> Option<&Task> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}
