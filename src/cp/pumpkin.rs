use super::model::{Constraint, CpModel, IntervalDef, LinearExpr, Literal};
use super::{CpSolution, CpSolver, SearchStats, SolveStatus, SolverParams};
use pumpkin_solver::Solver;
use pumpkin_solver::constraints;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution};
use pumpkin_solver::termination::{Indefinite, TimeBudget};
use pumpkin_solver::variables::{AffineView, DomainId, TransformableVariable};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Solves a [`CpModel`] with Pumpkin, a lazy clause generation solver.
///
/// Objective terms are grouped by coefficient and minimised heaviest group
/// first: each stage minimises the plain sum of its terms while every
/// heavier group is held at the optimum already found. Weights therefore
/// only rank the groups, and no weighted sum ever has to fit the solver's
/// 32-bit domains.
#[derive(Debug, Clone, Copy, Default)]
pub struct PumpkinSolver;

impl PumpkinSolver {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LowerError {
    /// Posting a constraint already failed at the root.
    Infeasible,
    /// A bound or coefficient does not fit a 32-bit integer.
    Overflow,
}

type Lowered<T = ()> = Result<T, LowerError>;

enum Stage {
    Optimal { values: Vec<i64>, bound: i64 },
    Feasible(Vec<i64>),
    Infeasible,
    Unknown,
    Unsupported,
}

fn narrow(value: i64) -> Lowered<i32> {
    i32::try_from(value).map_err(|_| LowerError::Overflow)
}

/// Translates the model's vocabulary onto Pumpkin linear constraints over
/// 0/1 and bounded integer domains.
struct Lowering {
    solver: Solver,
    vars: Vec<DomainId>,
    bounds: Vec<(i64, i64)>,
}

impl Lowering {
    fn from_model(model: &CpModel) -> Lowered<Self> {
        let mut lowering = Self {
            solver: Solver::default(),
            vars: Vec::with_capacity(model.vars.len()),
            bounds: Vec::with_capacity(model.vars.len()),
        };
        for def in &model.vars {
            if def.lb > def.ub {
                return Err(LowerError::Infeasible);
            }
            lowering.new_var(def.lb, def.ub, &def.name)?;
        }
        for constraint in &model.constraints {
            match constraint {
                Constraint::LinearLe {
                    terms,
                    rhs,
                    enforcement,
                } => lowering.post_enforced_le(terms, *rhs, enforcement)?,
                Constraint::BoolOr(literals) => lowering.post_bool_or(literals)?,
                Constraint::ExactlyOne(literals) => lowering.post_exactly_one(literals)?,
                Constraint::MaxEquality { target, vars } => {
                    lowering.post_max_equality(*target, vars)?
                }
                Constraint::NoOverlap(intervals) => lowering.post_no_overlap(model, intervals)?,
            }
        }
        Ok(lowering)
    }

    fn new_var(&mut self, lb: i64, ub: i64, name: &str) -> Lowered<usize> {
        let domain = self
            .solver
            .new_named_bounded_integer(narrow(lb)?, narrow(ub)?, name.to_string());
        self.vars.push(domain);
        self.bounds.push((lb, ub));
        Ok(self.vars.len() - 1)
    }

    /// Smallest and largest value `Σ coef·var` can take.
    fn range(&self, terms: &[(usize, i64)]) -> (i64, i64) {
        terms.iter().fold((0i64, 0i64), |(lo, hi), &(var, coef)| {
            let (lb, ub) = self.bounds[var];
            let (a, b) = (coef.saturating_mul(lb), coef.saturating_mul(ub));
            (lo.saturating_add(a.min(b)), hi.saturating_add(a.max(b)))
        })
    }

    fn views(&self, terms: &[(usize, i64)]) -> Lowered<Vec<AffineView<DomainId>>> {
        terms
            .iter()
            .map(|&(var, coef)| Ok(self.vars[var].scaled(narrow(coef)?)))
            .collect()
    }

    fn post_le(&mut self, terms: &[(usize, i64)], rhs: i64) -> Lowered {
        if terms.is_empty() {
            return if rhs >= 0 {
                Ok(())
            } else {
                Err(LowerError::Infeasible)
            };
        }
        let views = self.views(terms)?;
        let rhs = narrow(rhs)?;
        let tag = self.solver.new_constraint_tag();
        self.solver
            .add_constraint(constraints::less_than_or_equals(views, rhs, tag))
            .post()
            .map_err(|_| LowerError::Infeasible)
    }

    fn post_eq(&mut self, terms: &[(usize, i64)], rhs: i64) -> Lowered {
        if terms.is_empty() {
            return if rhs == 0 {
                Ok(())
            } else {
                Err(LowerError::Infeasible)
            };
        }
        let views = self.views(terms)?;
        let rhs = narrow(rhs)?;
        let tag = self.solver.new_constraint_tag();
        self.solver
            .add_constraint(constraints::equals(views, rhs, tag))
            .post()
            .map_err(|_| LowerError::Infeasible)
    }

    /// `Σ terms ≤ rhs` whenever every literal holds, as
    /// `Σ terms ≤ rhs + M·Σ(1 − literal)` with `M` the largest possible
    /// violation.
    fn post_enforced_le(&mut self, terms: &[(usize, i64)], rhs: i64, enforcement: &[Literal]) -> Lowered {
        if enforcement.is_empty() {
            return self.post_le(terms, rhs);
        }
        let (_, max) = self.range(terms);
        let big_m = max.saturating_sub(rhs);
        if big_m <= 0 {
            return Ok(());
        }
        let mut relaxed = terms.to_vec();
        let mut rhs = rhs;
        for literal in enforcement {
            if literal.positive {
                relaxed.push((literal.var, big_m));
                rhs = rhs.checked_add(big_m).ok_or(LowerError::Overflow)?;
            } else {
                relaxed.push((literal.var, -big_m));
            }
        }
        self.post_le(&relaxed, rhs)
    }

    /// Literal values as linear terms: `x` for a positive literal and
    /// `1 − x` for a negative one. Returns the terms and the constant part.
    fn literal_terms(literals: &[Literal]) -> (Vec<(usize, i64)>, i64) {
        let mut constant = 0;
        let terms = literals
            .iter()
            .map(|literal| {
                if literal.positive {
                    (literal.var, 1)
                } else {
                    constant += 1;
                    (literal.var, -1)
                }
            })
            .collect();
        (terms, constant)
    }

    fn post_bool_or(&mut self, literals: &[Literal]) -> Lowered {
        let (terms, constant) = Self::literal_terms(literals);
        let negated: Vec<(usize, i64)> = terms.into_iter().map(|(v, c)| (v, -c)).collect();
        // Σ values ≥ 1.
        self.post_le(&negated, constant - 1)
    }

    fn post_exactly_one(&mut self, literals: &[Literal]) -> Lowered {
        let (terms, constant) = Self::literal_terms(literals);
        self.post_eq(&terms, 1 - constant)
    }

    fn post_max_equality(&mut self, target: usize, vars: &[usize]) -> Lowered {
        if vars.is_empty() {
            return Ok(());
        }
        let array: Vec<DomainId> = vars.iter().map(|&var| self.vars[var]).collect();
        let tag = self.solver.new_constraint_tag();
        self.solver
            .add_constraint(constraints::maximum(array, self.vars[target], tag))
            .post()
            .map_err(|_| LowerError::Infeasible)
    }

    /// Pairwise disjunction: one order literal per pair that could meet,
    /// both sides enforced by the intervals' presence.
    fn post_no_overlap(&mut self, model: &CpModel, intervals: &[usize]) -> Lowered {
        for (i, &first) in intervals.iter().enumerate() {
            for &second in &intervals[i + 1..] {
                let a = &model.intervals[first];
                let b = &model.intervals[second];
                // Two fixed blocks are facts, not decisions.
                let fixed = |i: &IntervalDef| i.presence.is_none() && self.is_fixed(i.start) && self.is_fixed(i.end);
                if fixed(a) && fixed(b) {
                    continue;
                }
                let a_before_b_free = self.bounds[a.end].1 <= self.bounds[b.start].0;
                let b_before_a_free = self.bounds[b.end].1 <= self.bounds[a.start].0;
                if a_before_b_free || b_before_a_free {
                    continue;
                }

                let order = self.new_var(0, 1, &format!("{}_before_{}", a.name, b.name))?;
                let present: Vec<Literal> = [a.presence, b.presence].into_iter().flatten().collect();
                let mut first_enforce = present.clone();
                first_enforce.push(Literal {
                    var: order,
                    positive: true,
                });
                let mut second_enforce = present;
                second_enforce.push(Literal {
                    var: order,
                    positive: false,
                });
                self.post_enforced_le(&[(a.end, 1), (b.start, -1)], 0, &first_enforce)?;
                self.post_enforced_le(&[(b.end, 1), (a.start, -1)], 0, &second_enforce)?;
            }
        }
        Ok(())
    }

    fn is_fixed(&self, var: usize) -> bool {
        let (lb, ub) = self.bounds[var];
        lb == ub
    }
}

/// Objective terms grouped by coefficient magnitude, heaviest first, each
/// term reduced to its sign.
fn stages(objective: &LinearExpr) -> Vec<Vec<(usize, i64)>> {
    let mut groups: BTreeMap<i64, Vec<(usize, i64)>> = BTreeMap::new();
    for (var, coef) in objective.normalized() {
        groups
            .entry(coef.saturating_abs())
            .or_default()
            .push((var, coef.signum()));
    }
    groups.into_values().rev().collect()
}

fn objective_value(objective: &LinearExpr, values: &[i64]) -> i64 {
    objective
        .terms
        .iter()
        .fold(objective.constant, |acc, &(var, coef)| {
            acc.saturating_add(coef.saturating_mul(values[var]))
        })
}

impl PumpkinSolver {
    fn run_stage(
        &self,
        model: &CpModel,
        held: &[(Vec<(usize, i64)>, i64)],
        goal: &[(usize, i64)],
        budget: Option<Duration>,
    ) -> Stage {
        let prepared = Lowering::from_model(model).and_then(|mut lowering| {
            for (terms, bound) in held {
                lowering.post_le(terms, *bound)?;
            }
            let (lo, hi) = lowering.range(goal);
            let objective = lowering.new_var(lo, hi, "objective")?;
            let mut link = goal.to_vec();
            link.push((objective, -1));
            lowering.post_eq(&link, 0)?;
            Ok((lowering, objective))
        });
        let (mut lowering, objective) = match prepared {
            Ok(prepared) => prepared,
            Err(LowerError::Infeasible) => return Stage::Infeasible,
            Err(LowerError::Overflow) => return Stage::Unsupported,
        };

        let objective_var = lowering.vars[objective];
        let mut brancher = lowering.solver.default_brancher();
        let procedure = LinearSatUnsat::new(OptimisationDirection::Minimise, objective_var, |_: &Solver, _: pumpkin_solver::results::SolutionReference<'_>, _: &_| {});
        let result = match budget {
            Some(budget) => lowering.solver.optimise(
                &mut brancher,
                &mut TimeBudget::starting_now(budget),
                procedure,
            ),
            None => lowering
                .solver
                .optimise(&mut brancher, &mut Indefinite, procedure),
        };

        let model_vars = &lowering.vars[..model.vars.len()];
        let read = |solution: &dyn Fn(DomainId) -> i32| -> Vec<i64> {
            model_vars.iter().map(|&var| i64::from(solution(var))).collect()
        };
        match result {
            OptimisationResult::Optimal(solution) => Stage::Optimal {
                values: read(&|var| solution.get_integer_value(var)),
                bound: i64::from(solution.get_integer_value(objective_var)),
            },
            OptimisationResult::Satisfiable(solution) => {
                Stage::Feasible(read(&|var| solution.get_integer_value(var)))
            }
            OptimisationResult::Unsatisfiable => Stage::Infeasible,
            OptimisationResult::Unknown => Stage::Unknown,
        }
    }
}

impl CpSolver for PumpkinSolver {
    fn solve(&self, model: &CpModel, params: &SolverParams) -> CpSolution {
        let started = Instant::now();
        let goals = model.objective.as_ref().map(stages).unwrap_or_default();
        let stage_count = goals.len().max(1);
        let mut stats = SearchStats::default();
        let mut held: Vec<(Vec<(usize, i64)>, i64)> = Vec::with_capacity(stage_count);
        let mut best: Option<Vec<i64>> = None;
        let mut complete = true;
        let mut infeasible = false;

        for idx in 0..stage_count {
            let budget = match params.max_time {
                Some(limit) => match limit.checked_sub(started.elapsed()) {
                    Some(left) if !left.is_zero() => Some(left),
                    _ => {
                        complete = false;
                        break;
                    }
                },
                None => None,
            };
            let goal = goals.get(idx).map(Vec::as_slice).unwrap_or(&[]);
            match self.run_stage(model, &held, goal, budget) {
                Stage::Optimal { values, bound } => {
                    debug!(model = model.name(), stage = idx, bound, "stage solved to optimality");
                    stats.stages += 1;
                    held.push((goal.to_vec(), bound));
                    best = Some(values);
                }
                Stage::Feasible(values) => {
                    stats.stages += 1;
                    best = Some(values);
                    complete = false;
                    break;
                }
                Stage::Infeasible => {
                    infeasible = best.is_none();
                    complete = false;
                    break;
                }
                Stage::Unknown => {
                    complete = false;
                    break;
                }
                Stage::Unsupported => {
                    warn!(model = model.name(), "model bounds exceed the solver's integer range");
                    complete = false;
                    break;
                }
            }
        }

        stats.elapsed = started.elapsed();
        let status = match (&best, complete, infeasible) {
            (Some(_), true, _) => SolveStatus::Optimal,
            (Some(_), false, _) => SolveStatus::Feasible,
            (None, _, true) => SolveStatus::Infeasible,
            (None, _, false) => SolveStatus::Unknown,
        };
        debug!(
            model = model.name(),
            status = ?status,
            stages = stats.stages,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "search finished"
        );

        match best {
            Some(values) => CpSolution {
                status,
                objective: model
                    .objective
                    .as_ref()
                    .map(|objective| objective_value(objective, &values)),
                values,
                stats,
            },
            None => CpSolution::without_solution(status, stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{Linear, LinearExpr};

    #[test]
    fn finds_optimum_of_small_linear_problem() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(0, 10, "x");
        let y = model.new_int_var(0, 10, "y");
        model.add(Linear::ge(x + y, 7i64));
        model.add(Linear::le(x, 3i64));
        model.minimize(LinearExpr::term(x, 3) + LinearExpr::term(y, 5));

        let solution = PumpkinSolver.solve(&model, &SolverParams::default());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(x), 3);
        assert_eq!(solution.value(y), 4);
        assert_eq!(solution.objective, Some(29));
        assert_eq!(solution.stats.stages, 2);
    }

    #[test]
    fn reports_infeasible_models() {
        let mut model = CpModel::new("t");
        let a = model.new_bool_var("a");
        let b = model.new_bool_var("b");
        model.add_exactly_one([a, b]);
        model.add_bool_or([!a]);
        model.add_bool_or([!b]);
        let solution = PumpkinSolver.solve(&model, &SolverParams::default());
        assert_eq!(solution.status, SolveStatus::Infeasible);
        assert!(!solution.is_solution_found());
    }

    #[test]
    fn enforced_constraint_only_binds_when_its_literal_holds() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(0, 10, "x");
        let high = model.new_bool_var("high");
        model.add(Linear::ge(x, 6i64).only_enforce_if([high]));
        model.add(Linear::le(x, 2i64).only_enforce_if([!high]));
        model.add_bool_or([high]);
        model.minimize(x);

        let solution = PumpkinSolver.solve(&model, &SolverParams::default());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert!(solution.bool_value(high));
        assert_eq!(solution.value(x), 6);
    }

    #[test]
    fn heavier_terms_are_settled_first() {
        let mut model = CpModel::new("t");
        let s1 = model.new_int_var(0, 20, "s1");
        let e1 = model.new_int_var(0, 20, "e1");
        let d1 = model.new_constant(4);
        let s2 = model.new_int_var(0, 20, "s2");
        let e2 = model.new_int_var(0, 20, "e2");
        let d2 = model.new_constant(2);
        let i1 = model.new_interval(s1, d1, e1, "j1");
        let i2 = model.new_interval(s2, d2, e2, "j2");
        model.add_no_overlap([i1, i2]);
        // Job 2 is ten times as urgent.
        model.minimize(LinearExpr::term(s1, 1) + LinearExpr::term(s2, 10));

        let solution = PumpkinSolver.solve(&model, &SolverParams::default());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(s2), 0);
        assert_eq!(solution.value(s1), 2);
    }

    #[test]
    fn alternative_resources_pick_the_free_one() {
        let mut model = CpModel::new("t");
        let start = model.new_int_var(0, 10, "s");
        let end = model.new_int_var(0, 10, "e");
        let size = model.new_constant(3);
        let busy = model.new_fixed_interval(0, 6, "busy");
        let on_busy = model.new_bool_var("on_busy");
        let on_free = model.new_bool_var("on_free");
        let a = model.new_optional_interval(start, size, end, on_busy, "a");
        let b = model.new_optional_interval(start, size, end, on_free, "b");
        model.add_exactly_one([on_busy, on_free]);
        model.add_no_overlap([busy, a]);
        model.add_no_overlap([b]);
        model.minimize(end);

        let solution = PumpkinSolver.solve(&model, &SolverParams::default());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert!(solution.bool_value(on_free));
        assert_eq!(solution.value(start), 0);
        assert_eq!(solution.value(end), 3);
    }

    #[test]
    fn makespan_follows_the_latest_end() {
        let mut model = CpModel::new("t");
        let a = model.new_int_var(2, 5, "a");
        let b = model.new_int_var(4, 9, "b");
        let makespan = model.new_int_var(0, 20, "makespan");
        model.add_max_equality(makespan, [a, b]);
        model.minimize(makespan);

        let solution = PumpkinSolver.solve(&model, &SolverParams::default());
        assert_eq!(solution.status, SolveStatus::Optimal);
        assert_eq!(solution.value(makespan), 4);
    }

    #[test]
    fn zero_budget_returns_without_claiming_optimality() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(0, 100, "x");
        model.minimize(x);
        let params = SolverParams::default().with_max_time(Duration::ZERO);
        let solution = PumpkinSolver.solve(&model, &params);
        assert_eq!(solution.status, SolveStatus::Unknown);
        assert!(!solution.is_solution_found());
    }

    #[test]
    fn stages_rank_groups_by_weight() {
        let mut model = CpModel::new("t");
        let x = model.new_int_var(0, 1, "x");
        let y = model.new_int_var(0, 1, "y");
        let z = model.new_int_var(0, 1, "z");
        let objective = LinearExpr::term(x, 1) + LinearExpr::term(y, 100) + LinearExpr::term(z, 1);
        let groups = stages(&objective);
        assert_eq!(groups, vec![vec![(y.0, 1)], vec![(x.0, 1), (z.0, 1)]]);
    }
}
