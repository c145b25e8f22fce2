//! Builds the constraint model for a project, runs the solver and turns the
//! assignment back into plans and facts.

mod builder;
mod decode;

pub use builder::AssignmentMatrix;

use crate::config::SchedulerConfig;
use crate::cp::{CpSolver, PumpkinSolver, SolveStatus, SolverParams};
use crate::error::Result;
use crate::graph::{DependencyDag, flatten};
use crate::project::Project;
use builder::ModelBuilder;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// A copy of the input carrying plans and appended facts.
    Planned { project: Project, status: SolveStatus },
    /// The solver found nothing usable; the input is unchanged.
    Unsolved(SolveStatus),
}

impl SolveOutcome {
    pub fn status(&self) -> SolveStatus {
        match self {
            SolveOutcome::Planned { status, .. } => *status,
            SolveOutcome::Unsolved(status) => *status,
        }
    }

    pub fn into_project(self) -> Option<Project> {
        match self {
            SolveOutcome::Planned { project, .. } => Some(project),
            SolveOutcome::Unsolved(_) => None,
        }
    }
}

pub struct Scheduler<S = PumpkinSolver> {
    config: SchedulerConfig,
    solver: S,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_solver(config, PumpkinSolver::new())
    }
}

impl<S: CpSolver> Scheduler<S> {
    pub fn with_solver(config: SchedulerConfig, solver: S) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Validates, models and solves `project` without touching it.
    pub fn solve(&self, project: &Project) -> Result<SolveOutcome> {
        self.config.validate()?;
        let flat = flatten(project, &self.config)?;
        let dag = DependencyDag::build(&flat)?;
        let order = dag.priority_order(&flat, &self.config);
        info!(
            start = %project.start,
            tasks = flat.solvable_count(),
            resources = project.resources.len(),
            horizon = self.config.horizon_days,
            "scheduling project"
        );

        let built = ModelBuilder::new(project, &flat, &self.config)?.build(&order)?;

        let params = SolverParams {
            max_time: self.config.time_budget(),
        };
        let solution = self.solver.solve(&built.model, &params);
        info!(
            status = ?solution.status,
            objective = ?solution.objective,
            stages = solution.stats.stages,
            elapsed_ms = solution.stats.elapsed.as_millis() as u64,
            "solver finished"
        );

        if !solution.is_solution_found() {
            warn!(status = ?solution.status, "no schedule found");
            return Ok(SolveOutcome::Unsolved(solution.status));
        }

        let planned = decode::decode(project, &built, &solution)?;
        Ok(SolveOutcome::Planned {
            project: planned,
            status: solution.status,
        })
    }

    /// Replaces `project` with the planned copy on success. Returns false,
    /// leaving it untouched, when no schedule was found.
    pub fn solve_in_place(&self, project: &mut Project) -> Result<bool> {
        match self.solve(project)? {
            SolveOutcome::Planned { project: planned, .. } => {
                *project = planned;
                Ok(true)
            }
            SolveOutcome::Unsolved(_) => Ok(false),
        }
    }
}
