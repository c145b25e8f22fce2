use crate::calendar::WorkCalendar;
use crate::config::SchedulerConfig;
use crate::cp::{BoolVar, CpModel, IntVar, IntervalVar, Linear, LinearExpr, Literal};
use crate::error::{Result, ScheduleError};
use crate::fact::FactKind;
use crate::graph::FlatTasks;
use crate::project::Project;
use crate::resource::Resource;
use crate::task::Task;
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// Dense task × resource table of "uses-resource" booleans.
#[derive(Debug, Clone)]
pub struct AssignmentMatrix {
    resources: usize,
    cells: Vec<Option<BoolVar>>,
}

impl AssignmentMatrix {
    pub fn new(tasks: usize, resources: usize) -> Self {
        Self {
            resources,
            cells: vec![None; tasks * resources],
        }
    }

    pub fn set(&mut self, task: usize, resource: usize, var: BoolVar) {
        self.cells[task * self.resources + resource] = Some(var);
    }

    pub fn get(&self, task: usize, resource: usize) -> Option<BoolVar> {
        self.cells
            .get(task * self.resources + resource)
            .copied()
            .flatten()
    }

    /// `(resource, var)` pairs that exist for `task`.
    pub fn row(&self, task: usize) -> impl Iterator<Item = (usize, BoolVar)> + '_ {
        let from = task * self.resources;
        self.cells[from..from + self.resources]
            .iter()
            .enumerate()
            .filter_map(|(resource, cell)| cell.map(|var| (resource, var)))
    }
}

/// Variables created for one solvable leaf.
#[derive(Debug, Clone)]
pub(crate) struct TaskVars {
    pub(crate) id: String,
    pub(crate) start: IntVar,
    pub(crate) end: IntVar,
    /// Resource fixed by progress history; no assignment boolean exists then.
    pub(crate) pinned_resource: Option<usize>,
    /// Limit-derived duration for each eligible resource.
    pub(crate) base_durations: Vec<(usize, i64)>,
}

impl TaskVars {
    pub(crate) fn base_duration(&self, resource: usize) -> Option<i64> {
        self.base_durations
            .iter()
            .find(|(r, _)| *r == resource)
            .map(|(_, days)| *days)
    }
}

/// A built model plus the handles needed to read a solution back.
pub(crate) struct ScheduleModel {
    pub(crate) model: CpModel,
    pub(crate) tasks: Vec<TaskVars>,
    pub(crate) assignments: AssignmentMatrix,
    /// One per project resource, same order.
    pub(crate) calendars: Vec<WorkCalendar>,
    pub(crate) makespan: IntVar,
}

/// Progress-derived start pin of an in-progress task.
struct Pin {
    start: i64,
    remaining: Option<i64>,
}

/// Duration from a leaf's limit for one resource: explicit days or the size
/// bucket at the effective confidence, plus buffer, scaled by efficiency.
pub(crate) fn base_duration(task: &Task, resource: &Resource) -> Result<i64> {
    let limit = task
        .limit
        .as_ref()
        .ok_or_else(|| ScheduleError::MissingLimit(task.id.clone()))?;
    let confidence = limit.confidence.unwrap_or(resource.confidence);
    let mut days = match (limit.duration, limit.size) {
        (Some(days), _) => days,
        (None, Some(size)) => size.days(confidence),
        (None, None) => {
            return Err(ScheduleError::InvalidLimit {
                task: task.id.clone(),
                reason: "either duration or size is required".into(),
            });
        }
    };
    days += limit.buffer.unwrap_or(0);
    if resource.efficiency != 100 {
        days = (days * 100 / resource.efficiency).max(1);
    }
    Ok(days)
}

fn validate_resources(resources: &[Resource]) -> Result<()> {
    let mut names = HashSet::with_capacity(resources.len());
    for resource in resources {
        if resource.efficiency <= 0 {
            return Err(ScheduleError::InvalidEfficiency {
                resource: resource.name.clone(),
                efficiency: resource.efficiency,
            });
        }
        if !names.insert(resource.name.as_str()) {
            return Err(ScheduleError::DuplicateResource(resource.name.clone()));
        }
    }
    Ok(())
}

pub(crate) struct ModelBuilder<'a> {
    project: &'a Project,
    flat: &'a FlatTasks,
    config: &'a SchedulerConfig,
    horizon: i64,
    model: CpModel,
    calendars: Vec<WorkCalendar>,
    resource_intervals: Vec<Vec<IntervalVar>>,
}

impl<'a> ModelBuilder<'a> {
    pub(crate) fn new(
        project: &'a Project,
        flat: &'a FlatTasks,
        config: &'a SchedulerConfig,
    ) -> Result<Self> {
        validate_resources(&project.resources)?;

        let horizon = config.horizon_days;
        let calendars: Vec<WorkCalendar> = project
            .resources
            .par_iter()
            .map(|resource| {
                WorkCalendar::new(
                    horizon,
                    project.start,
                    project.calendar.as_ref(),
                    resource.calendar.as_ref(),
                )
            })
            .collect();

        Ok(Self {
            project,
            flat,
            config,
            horizon: horizon as i64,
            model: CpModel::new("schedule"),
            calendars,
            resource_intervals: vec![Vec::new(); project.resources.len()],
        })
    }

    fn offset(&self, date: NaiveDate) -> i64 {
        (date - self.project.start).num_days()
    }

    /// `order` lists every solvable leaf id, most urgent first.
    pub(crate) fn build(mut self, order: &[String]) -> Result<ScheduleModel> {
        self.add_availability_breaks();

        let flat = self.flat;
        // Leaves enter the model in priority order.
        let rank: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.as_str(), idx))
            .collect();
        let mut solvable: Vec<&Task> = flat.solvable().collect();
        solvable.sort_by_key(|task| rank.get(task.id.as_str()).copied().unwrap_or(usize::MAX));
        let mut assignments = AssignmentMatrix::new(solvable.len(), self.project.resources.len());
        let mut tasks = Vec::with_capacity(solvable.len());
        for (idx, task) in solvable.iter().enumerate() {
            tasks.push(self.add_task(idx, task, &mut assignments)?);
        }

        let index: HashMap<&str, usize> = tasks
            .iter()
            .enumerate()
            .map(|(idx, vars)| (vars.id.as_str(), idx))
            .collect();
        self.add_dependencies(&solvable, &tasks, &index);

        for intervals in &self.resource_intervals {
            self.model.add_no_overlap(intervals.iter().copied());
        }

        let makespan = self.model.new_int_var(0, self.horizon, "makespan");
        self.model
            .add_max_equality(makespan, tasks.iter().map(|vars| vars.end));
        let weighted_starts = LinearExpr::weighted_sum(
            solvable
                .iter()
                .zip(&tasks)
                .map(|(task, vars)| (vars.start, self.config.weight(task.effective_priority()))),
        );
        self.model.minimize(weighted_starts + makespan);

        debug!(
            tasks = tasks.len(),
            variables = self.model.var_count(),
            intervals = self.model.interval_count(),
            constraints = self.model.constraint_count(),
            "constraint model built"
        );

        Ok(ScheduleModel {
            model: self.model,
            tasks,
            assignments,
            calendars: self.calendars,
            makespan,
        })
    }

    /// Fixed intervals blocking the days before `avail_from` and after
    /// `avail_to`.
    fn add_availability_breaks(&mut self) {
        let project = self.project;
        for (idx, resource) in project.resources.iter().enumerate() {
            if let Some(from) = resource.avail_from.filter(|date| *date > project.start) {
                let shift = self.offset(from).min(self.horizon);
                let brk = self
                    .model
                    .new_fixed_interval(0, shift, format!("brk_from_{}", resource.name));
                self.resource_intervals[idx].push(brk);
            }
            if let Some(to) = resource.avail_to {
                let from = (self.offset(to) + 1).clamp(0, self.horizon);
                let size = self.horizon - from;
                if size > 0 {
                    let brk = self
                        .model
                        .new_fixed_interval(from, size, format!("brk_to_{}", resource.name));
                    self.resource_intervals[idx].push(brk);
                }
            }
        }
    }

    fn eligible_resources(&self, task: &Task) -> Result<Vec<usize>> {
        let resources = &self.project.resources;
        let limit = task
            .limit
            .as_ref()
            .ok_or_else(|| ScheduleError::MissingLimit(task.id.clone()))?;

        let mut name = limit
            .resource_name
            .as_deref()
            .filter(|name| !name.trim().is_empty());
        if task.fact.is_progress() {
            if let Some(last) = task.fact.last_assignee() {
                name = Some(last);
            }
        }
        if let Some(name) = name {
            return resources
                .iter()
                .position(|r| r.name == name)
                .map(|idx| vec![idx])
                .ok_or_else(|| ScheduleError::UnknownResource {
                    task: task.id.clone(),
                    resource: name.to_string(),
                });
        }

        let role = limit
            .resource_role
            .as_deref()
            .filter(|role| !role.trim().is_empty());
        let eligible: Vec<usize> = match role {
            Some(role) => resources
                .iter()
                .enumerate()
                .filter(|(_, r)| r.role == role)
                .map(|(idx, _)| idx)
                .collect(),
            None => Vec::new(),
        };
        if eligible.is_empty() {
            return Err(ScheduleError::NoEligibleResource {
                task: task.id.clone(),
                role: role.map(str::to_string),
            });
        }
        Ok(eligible)
    }

    // Started pins the start to its own day; later records describe a day
    // already worked, so the remainder begins the day after. Start and
    // remaining length come from the same record.
    fn pin(&self, task: &Task) -> Option<Pin> {
        if !task.fact.is_progress() {
            return None;
        }
        let record = task
            .fact
            .last_progress_with_duration()
            .or_else(|| task.fact.last_progress())?;
        let mut start = self.offset(record.recorded_at);
        if record.kind != FactKind::Started {
            start += 1;
        }
        let remaining = record.duration.filter(|days| *days > 0);
        Some(Pin { start, remaining })
    }

    fn add_task(
        &mut self,
        idx: usize,
        task: &Task,
        assignments: &mut AssignmentMatrix,
    ) -> Result<TaskVars> {
        let project = self.project;
        let id = task.id.as_str();
        let eligible = self.eligible_resources(task)?;
        let pin = self.pin(task);

        let start = match &pin {
            Some(pin) => self
                .model
                .new_int_var(pin.start, pin.start, format!("start_{id}")),
            None => self.model.new_int_var(0, self.horizon, format!("start_{id}")),
        };
        let end = self.model.new_int_var(0, self.horizon, format!("end_{id}"));
        let pinned_resource = match (&pin, eligible.as_slice()) {
            (Some(_), [only]) => Some(*only),
            _ => None,
        };
        let first_day = pin.as_ref().map_or(0, |pin| pin.start.max(0));

        let mut crosses: BTreeMap<i64, BoolVar> = BTreeMap::new();
        let mut uses = Vec::new();
        let mut base_durations = Vec::with_capacity(eligible.len());
        for &r in &eligible {
            let resource = &project.resources[r];
            let base = base_duration(task, resource)?;
            base_durations.push((r, base));
            let duration = pin.as_ref().and_then(|pin| pin.remaining).unwrap_or(base);

            let days: Vec<i64> = self.calendars[r]
                .non_working_offsets()
                .into_iter()
                .filter(|day| *day >= first_day)
                .collect();
            let mut day_vars = Vec::with_capacity(days.len());
            for day in days {
                let cross = match crosses.get(&day) {
                    Some(&cross) => cross,
                    None => {
                        let cross = self.new_cross(id, start, end, day);
                        crosses.insert(day, cross);
                        cross
                    }
                };
                day_vars.push(cross);
            }

            let size = self.model.new_int_var(
                duration,
                duration + day_vars.len() as i64,
                format!("dur_{id}_{}", resource.name),
            );
            self.model
                .add(Linear::eq(size, LinearExpr::sum(day_vars) + duration));

            let interval = if pinned_resource == Some(r) {
                self.model
                    .new_interval(start, size, end, format!("fix_{id}_{}", resource.name))
            } else {
                let used = self.model.new_bool_var(format!("use_{id}_{}", resource.name));
                assignments.set(idx, r, used);
                uses.push(used);
                self.model.new_optional_interval(
                    start,
                    size,
                    end,
                    used,
                    format!("opt_{id}_{}", resource.name),
                )
            };
            self.resource_intervals[r].push(interval);
        }
        if !uses.is_empty() {
            self.model.add_exactly_one(uses);
        }

        if pin.is_none() {
            if let Some(limit) = &task.limit {
                if let Some(after) = limit.start_after {
                    let offset = self.offset(after);
                    if offset > 0 {
                        self.model.add(Linear::ge(start, offset));
                    }
                }
                if let Some(due) = limit.due_date {
                    self.model.add(Linear::le(end, self.offset(due) + 1));
                }
            }
        }

        Ok(TaskVars {
            id: task.id.clone(),
            start,
            end,
            pinned_resource,
            base_durations,
        })
    }

    /// `cross ⇔ (start ≤ day) ∧ (end ≥ day + 1)`, reified in both
    /// directions through two helper literals.
    fn new_cross(&mut self, id: &str, start: IntVar, end: IntVar, day: i64) -> BoolVar {
        let cross = self.model.new_bool_var(format!("cross_{id}_{day}"));
        let starts_by = self.model.new_bool_var(format!("starts_by_{id}_{day}"));
        let ends_after = self.model.new_bool_var(format!("ends_after_{id}_{day}"));

        self.model
            .add(Linear::le(start, day).only_enforce_if([starts_by]));
        self.model
            .add(Linear::ge(start, day + 1).only_enforce_if([!starts_by]));
        self.model
            .add(Linear::ge(end, day + 1).only_enforce_if([ends_after]));
        self.model
            .add(Linear::le(end, day).only_enforce_if([!ends_after]));

        self.model.add_bool_or([!cross, Literal::from(starts_by)]);
        self.model.add_bool_or([!cross, Literal::from(ends_after)]);
        self.model
            .add_bool_or([Literal::from(cross), !starts_by, !ends_after]);
        cross
    }

    fn add_dependencies(&mut self, solvable: &[&Task], tasks: &[TaskVars], index: &HashMap<&str, usize>) {
        for (task, vars) in solvable.iter().zip(tasks) {
            let Some(limit) = &task.limit else {
                continue;
            };
            for pred in &limit.predecessors {
                if let Some(&p) = index.get(pred.as_str()) {
                    self.model.add(Linear::ge(vars.start, tasks[p].end));
                }
            }
        }
    }
}
