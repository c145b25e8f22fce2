use crate::error::{Result as ScheduleResult, ScheduleError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_HORIZON_DAYS: usize = 180;
pub const MAX_HORIZON_DAYS: usize = 3650;

/// Tunables for a solve.
///
/// Priority buckets are small integers where 1 is the most urgent. Weights
/// rank the buckets: start offsets of heavier buckets are minimised before
/// lighter ones are considered, and buckets sharing a weight are minimised
/// together with the makespan when that weight is 1. Bucket 0 is the weight
/// used for tasks without a priority and must stay present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub horizon_days: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_seconds: Option<f64>,
    pub priority_weights: BTreeMap<u8, i64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            max_seconds: None,
            priority_weights: BTreeMap::from([
                (0, 1),
                (1, 100_000_000),
                (2, 100_000),
                (3, 100),
            ]),
        }
    }
}

impl SchedulerConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn with_horizon_days(mut self, horizon_days: usize) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_max_seconds(mut self, max_seconds: f64) -> Self {
        self.max_seconds = Some(max_seconds);
        self
    }

    pub fn with_priority_weight(mut self, priority: u8, weight: i64) -> Self {
        self.priority_weights.insert(priority, weight);
        self
    }

    pub fn has_priority(&self, priority: u8) -> bool {
        self.priority_weights.contains_key(&priority)
    }

    /// Objective weight for a task's start; unset priorities use bucket 0.
    pub fn weight(&self, priority: Option<u8>) -> i64 {
        let bucket = priority.unwrap_or(0);
        self.priority_weights
            .get(&bucket)
            .or_else(|| self.priority_weights.get(&0))
            .copied()
            .unwrap_or(1)
    }

    /// Rejects horizons and weights the model cannot represent.
    pub fn validate(&self) -> ScheduleResult<()> {
        if self.horizon_days == 0 || self.horizon_days > MAX_HORIZON_DAYS {
            return Err(ScheduleError::InvalidConfig(format!(
                "horizon_days must be between 1 and {MAX_HORIZON_DAYS}, got {}",
                self.horizon_days
            )));
        }
        if !self.priority_weights.contains_key(&0) {
            return Err(ScheduleError::InvalidConfig(
                "priority_weights has no entry for bucket 0".to_string(),
            ));
        }
        if let Some((bucket, weight)) = self.priority_weights.iter().find(|(_, w)| **w <= 0) {
            return Err(ScheduleError::InvalidConfig(format!(
                "weight of priority {bucket} must be positive, got {weight}"
            )));
        }
        Ok(())
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.max_seconds
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64)
    }
}
