//! Constraint model vocabulary and the solver seam.
//!
//! The scheduler builds a [`CpModel`] and hands it to a [`CpSolver`]. The
//! default engine, [`PumpkinSolver`], lowers the model onto the Pumpkin
//! solver.

mod model;
mod pumpkin;

use std::time::Duration;

pub use model::{BoolVar, CpModel, IntVar, IntervalVar, Linear, LinearExpr, Literal};
pub use pumpkin::PumpkinSolver;

/// Outcome class of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Every objective stage was proven optimal.
    Optimal,
    /// A solution was found but the time budget ran out first.
    Feasible,
    /// Proven to have no solution.
    Infeasible,
    /// Time ran out before any solution was found.
    Unknown,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolverParams {
    pub max_time: Option<Duration>,
}

impl SolverParams {
    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchStats {
    /// Objective stages that produced a solution.
    pub stages: u32,
    pub elapsed: Duration,
}

/// Variable assignment returned by a solver.
#[derive(Debug, Clone)]
pub struct CpSolution {
    pub status: SolveStatus,
    pub values: Vec<i64>,
    pub objective: Option<i64>,
    pub stats: SearchStats,
}

impl CpSolution {
    pub fn without_solution(status: SolveStatus, stats: SearchStats) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective: None,
            stats,
        }
    }

    pub fn is_solution_found(&self) -> bool {
        self.status.has_solution() && !self.values.is_empty()
    }

    /// Value of `var`, or 0 when no solution is held.
    pub fn value(&self, var: impl Into<IntVar>) -> i64 {
        self.values.get(var.into().0).copied().unwrap_or(0)
    }

    pub fn bool_value(&self, var: BoolVar) -> bool {
        self.value(var) != 0
    }
}

/// Anything able to solve a [`CpModel`].
pub trait CpSolver {
    fn solve(&self, model: &CpModel, params: &SolverParams) -> CpSolution;
}

impl<S: CpSolver + ?Sized> CpSolver for &S {
    fn solve(&self, model: &CpModel, params: &SolverParams) -> CpSolution {
        (**self).solve(model, params)
    }
}
