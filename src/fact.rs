use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactKind {
    Started,
    InProgress,
    Completed,
    Canceled,
    Paused,
    ChangedAssignee,
    CorrectedDuration,
    Other,
}

impl FactKind {
    fn is_lifecycle(self) -> bool {
        matches!(
            self,
            FactKind::Started
                | FactKind::InProgress
                | FactKind::Paused
                | FactKind::Completed
                | FactKind::Canceled
        )
    }

    fn is_progress(self) -> bool {
        matches!(
            self,
            FactKind::Started | FactKind::InProgress | FactKind::CorrectedDuration
        )
    }
}

/// One observation about a task's execution.
///
/// `duration` is absolute: the number of working days still required as of
/// `recorded_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRecord {
    pub recorded_at: NaiveDate,
    pub kind: FactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl FactRecord {
    pub fn new(kind: FactKind, recorded_at: NaiveDate) -> Self {
        Self {
            recorded_at,
            kind,
            resource_name: None,
            duration: None,
            comments: None,
        }
    }

    pub fn started(recorded_at: NaiveDate) -> Self {
        Self::new(FactKind::Started, recorded_at)
    }

    pub fn in_progress(recorded_at: NaiveDate) -> Self {
        Self::new(FactKind::InProgress, recorded_at)
    }

    pub fn completed(recorded_at: NaiveDate) -> Self {
        Self::new(FactKind::Completed, recorded_at)
    }

    pub fn canceled(recorded_at: NaiveDate) -> Self {
        Self::new(FactKind::Canceled, recorded_at)
    }

    pub fn paused(recorded_at: NaiveDate) -> Self {
        Self::new(FactKind::Paused, recorded_at)
    }

    pub fn with_resource(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// Append-only execution history. Status is always derived from the
/// records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    #[serde(default)]
    records: Vec<FactRecord>,
}

impl Fact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = FactRecord>,
    {
        Self {
            records: records.into_iter().collect(),
        }
    }

    pub fn push(&mut self, record: FactRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[FactRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has(&self, kind: FactKind) -> bool {
        self.records.iter().any(|r| r.kind == kind)
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.records
            .iter()
            .find(|r| r.kind == FactKind::Started)
            .map(|r| r.recorded_at)
    }

    pub fn finish_date(&self) -> Option<NaiveDate> {
        self.records
            .iter()
            .find(|r| matches!(r.kind, FactKind::Completed | FactKind::Canceled))
            .map(|r| r.recorded_at)
    }

    pub fn is_finished(&self) -> bool {
        self.finish_date().is_some()
    }

    pub fn is_progress(&self) -> bool {
        !self.is_finished()
            && self
                .records
                .iter()
                .any(|r| matches!(r.kind, FactKind::Started | FactKind::InProgress))
    }

    pub fn is_paused(&self) -> bool {
        self.records
            .iter()
            .rev()
            .find(|r| r.kind.is_lifecycle())
            .is_some_and(|r| r.kind == FactKind::Paused)
    }

    /// Most recent record naming a resource.
    pub fn last_assignee(&self) -> Option<&str> {
        self.records
            .iter()
            .rev()
            .find_map(|r| r.resource_name.as_deref())
    }

    /// Most recent Started, InProgress or CorrectedDuration record.
    pub fn last_progress(&self) -> Option<&FactRecord> {
        self.records.iter().rev().find(|r| r.kind.is_progress())
    }

    /// Most recent progress record that carries a remaining duration.
    pub fn last_progress_with_duration(&self) -> Option<&FactRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.kind.is_progress() && r.duration.is_some())
    }
}
