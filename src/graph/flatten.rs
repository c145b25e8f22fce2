use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::project::Project;
use crate::task::{Task, WorkType};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Attributes a task inherits from its nearest ancestor that sets them.
#[derive(Debug, Clone, Copy, Default)]
struct Inherited {
    priority: Option<u8>,
    work_type: Option<WorkType>,
    okr: Option<bool>,
    disabled: bool,
}

impl Inherited {
    fn resolve(self, task: &Task) -> Self {
        Self {
            priority: task.priority.or(self.priority),
            work_type: task.work_type.or(self.work_type),
            okr: task.okr.or(self.okr),
            disabled: self.disabled || task.disabled,
        }
    }
}

/// Validated, linearized view of a project tree.
///
/// Every leaf is cloned with its inherited attributes resolved and its
/// predecessor list rewritten to concrete, schedulable leaf ids. The
/// project itself is never modified.
#[derive(Debug, Clone, Default)]
pub struct FlatTasks {
    leaves: Vec<Task>,
    index: HashMap<String, usize>,
    groups: HashMap<String, Vec<String>>,
    solvable: Vec<usize>,
}

impl FlatTasks {
    /// Working copies of all leaves, in depth-first order.
    pub fn leaves(&self) -> &[Task] {
        &self.leaves
    }

    pub fn leaf(&self, id: &str) -> Option<&Task> {
        self.index.get(id).map(|&idx| &self.leaves[idx])
    }

    /// Leaves that need scheduling, in depth-first order.
    pub fn solvable(&self) -> impl Iterator<Item = &Task> + '_ {
        self.solvable.iter().map(|&idx| &self.leaves[idx])
    }

    pub fn solvable_count(&self) -> usize {
        self.solvable.len()
    }

    pub fn is_solvable(&self, id: &str) -> bool {
        self.leaf(id).is_some_and(|task| !task.can_skip())
    }

    pub fn is_group(&self, id: &str) -> bool {
        self.groups.contains_key(id)
    }

    /// Every leaf below the group `id`, through nested groups.
    pub fn group_leaves(&self, id: &str) -> Option<&[String]> {
        self.groups.get(id).map(Vec::as_slice)
    }

    fn visit(
        &mut self,
        task: &Task,
        ctx: Inherited,
        seen: &mut HashSet<String>,
        config: &SchedulerConfig,
    ) -> Result<Vec<String>> {
        if task.id.trim().is_empty() {
            return Err(ScheduleError::MissingId);
        }
        if !seen.insert(task.id.clone()) {
            return Err(ScheduleError::DuplicateId(task.id.clone()));
        }
        let ctx = ctx.resolve(task);

        if task.is_group() {
            let mut below = Vec::new();
            for child in &task.children {
                below.extend(self.visit(child, ctx, seen, config)?);
            }
            self.groups.insert(task.id.clone(), below.clone());
            return Ok(below);
        }

        let Some(limit) = &task.limit else {
            return Err(ScheduleError::MissingLimit(task.id.clone()));
        };
        limit
            .validate()
            .map_err(|reason| ScheduleError::InvalidLimit {
                task: task.id.clone(),
                reason,
            })?;

        let mut copy = task.clone();
        copy.priority = ctx.priority;
        copy.work_type = ctx.work_type;
        copy.okr = ctx.okr;
        copy.disabled = ctx.disabled;
        if let Some(priority) = copy.effective_priority() {
            if !config.has_priority(priority) {
                return Err(ScheduleError::InvalidPriority {
                    task: task.id.clone(),
                    priority,
                });
            }
        }

        let idx = self.leaves.len();
        if !copy.can_skip() {
            self.solvable.push(idx);
        }
        self.index.insert(copy.id.clone(), idx);
        self.leaves.push(copy);
        Ok(vec![task.id.clone()])
    }

    /// Rewrites predecessor lists to leaf ids. A group id stands for the
    /// predecessors of the leaves below it, so depending on a group means
    /// waiting for whatever that group waits for.
    fn resolve_predecessors(&mut self) -> Result<()> {
        let mut updates = Vec::with_capacity(self.solvable.len());
        for &idx in &self.solvable {
            let task = &self.leaves[idx];
            let Some(limit) = &task.limit else {
                continue;
            };

            let mut collected = Vec::with_capacity(limit.predecessors.len());
            let mut open = Vec::new();
            for pred in &limit.predecessors {
                self.expand(&task.id, pred, &mut open, &mut collected)?;
            }

            let mut resolved: Vec<String> = Vec::with_capacity(collected.len());
            for id in collected {
                let skippable = self
                    .index
                    .get(&id)
                    .is_none_or(|&i| self.leaves[i].can_skip());
                if !skippable && !resolved.contains(&id) {
                    resolved.push(id);
                }
            }
            updates.push((idx, resolved));
        }

        for (idx, resolved) in updates {
            if let Some(limit) = self.leaves[idx].limit.as_mut() {
                limit.predecessors = resolved;
            }
        }
        Ok(())
    }

    fn expand(&self, task: &str, pred: &str, open: &mut Vec<String>, out: &mut Vec<String>) -> Result<()> {
        if self.index.contains_key(pred) {
            out.push(pred.to_string());
            return Ok(());
        }
        let Some(below) = self.groups.get(pred) else {
            return Err(ScheduleError::UnknownPredecessor {
                task: task.to_string(),
                predecessor: pred.to_string(),
            });
        };
        if open.iter().any(|group| group == pred) {
            return Ok(());
        }
        open.push(pred.to_string());
        for leaf in below {
            let Some(limit) = self.leaf(leaf).and_then(|t| t.limit.as_ref()) else {
                continue;
            };
            for inner in &limit.predecessors {
                self.expand(leaf, inner, open, out)?;
            }
        }
        open.pop();
        Ok(())
    }
}

/// Validates the project tree and produces the working set for one solve.
pub fn flatten(project: &Project, config: &SchedulerConfig) -> Result<FlatTasks> {
    if let Some(fact_date) = project.fact_date {
        if fact_date < project.start {
            return Err(ScheduleError::FactDateBeforeStart {
                start: project.start,
                fact_date,
            });
        }
    }
    let root = project.root.as_ref().ok_or(ScheduleError::MissingRoot)?;

    let mut flat = FlatTasks::default();
    let mut seen = HashSet::new();
    flat.visit(root, Inherited::default(), &mut seen, config)?;

    if flat.solvable.is_empty() {
        return Err(ScheduleError::EmptyProject);
    }
    flat.resolve_predecessors()?;

    debug!(
        leaves = flat.leaves.len(),
        groups = flat.groups.len(),
        solvable = flat.solvable.len(),
        "project tree flattened"
    );
    Ok(flat)
}
