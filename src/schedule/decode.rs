use super::builder::{ScheduleModel, TaskVars};
use crate::cp::CpSolution;
use crate::error::{Result, ScheduleError};
use crate::fact::{FactKind, FactRecord};
use crate::project::Project;
use crate::task::{Plan, Task};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use tracing::debug;

/// Solved placement of one leaf.
struct Placement<'m> {
    vars: &'m TaskVars,
    start: NaiveDate,
    finish: NaiveDate,
    resource: usize,
}

/// Writes plans and progress facts into a copy of `project`.
pub(crate) fn decode(
    project: &Project,
    built: &ScheduleModel,
    solution: &CpSolution,
) -> Result<Project> {
    let mut placements: HashMap<&str, Placement<'_>> = HashMap::with_capacity(built.tasks.len());
    for (idx, vars) in built.tasks.iter().enumerate() {
        let start_offset = solution.value(vars.start);
        let end_offset = solution.value(vars.end);
        let resource = vars
            .pinned_resource
            .or_else(|| {
                built
                    .assignments
                    .row(idx)
                    .find(|(_, used)| solution.bool_value(*used))
                    .map(|(resource, _)| resource)
            })
            .ok_or_else(|| ScheduleError::ResourceResolution(vars.id.clone()))?;
        placements.insert(
            vars.id.as_str(),
            Placement {
                vars,
                start: project.start + Duration::days(start_offset),
                finish: project.start + Duration::days(end_offset - 1),
                resource,
            },
        );
    }

    let mut planned = project.clone();
    if let Some(root) = planned.root.as_mut() {
        apply(root, project, built, &placements)?;
    }
    debug!(
        makespan = solution.value(built.makespan),
        placed = placements.len(),
        "solution decoded"
    );
    Ok(planned)
}

// Post-order: leaves get their placement, groups span their children.
fn apply(
    task: &mut Task,
    project: &Project,
    built: &ScheduleModel,
    placements: &HashMap<&str, Placement<'_>>,
) -> Result<()> {
    if task.is_group() {
        for child in &mut task.children {
            apply(child, project, built, placements)?;
        }
        let plans = task.children.iter().filter_map(|child| child.plan.as_ref());
        let start = plans.clone().filter_map(|plan| plan.start).min();
        let finish = plans.filter_map(|plan| plan.finish).max();
        if start.is_some() || finish.is_some() {
            let plan = task.plan.get_or_insert_with(Plan::default);
            plan.start = start;
            plan.finish = finish;
        }
        return Ok(());
    }

    let Some(placement) = placements.get(task.id.as_str()) else {
        return Ok(());
    };
    let resource = &project.resources[placement.resource];

    let plan = task.plan.get_or_insert_with(Plan::default);
    plan.start = Some(placement.start);
    plan.finish = Some(placement.finish);
    if plan
        .resource_name
        .as_deref()
        .is_none_or(|name| name.trim().is_empty())
    {
        plan.resource_name = Some(resource.name.clone());
    }

    if !task.fact.has(FactKind::Started) {
        let mut record = FactRecord::started(placement.start).with_resource(&resource.name);
        if let Some(days) = placement.vars.base_duration(placement.resource) {
            record = record.with_duration(days);
        }
        task.fact.push(record);
        debug!(task = %task.id, date = %placement.start, "started fact appended");
    }

    let Some(fact_date) = project.fact_date else {
        return Ok(());
    };
    if fact_date >= placement.finish {
        if !task.fact.has(FactKind::Completed) {
            task.fact
                .push(FactRecord::completed(placement.finish).with_resource(&resource.name));
            debug!(task = %task.id, date = %placement.finish, "completed fact appended");
        }
    } else if fact_date >= placement.start {
        let last = task
            .fact
            .last_progress_with_duration()
            .map(|record| (record.recorded_at, record.duration.unwrap_or(0)));
        if let Some((recorded_at, duration)) = last.filter(|(at, _)| *at < fact_date) {
            let calendar = &built.calendars[placement.resource];
            let counted_from = placement.start.max(project.start);
            let elapsed = calendar.working_days_count(counted_from, fact_date)?;
            let remaining = (duration - elapsed).max(0);
            task.fact.push(
                FactRecord::in_progress(fact_date)
                    .with_resource(&resource.name)
                    .with_duration(remaining),
            );
            debug!(
                task = %task.id,
                since = %recorded_at,
                remaining,
                "in-progress fact appended"
            );
        }
    }
    Ok(())
}
