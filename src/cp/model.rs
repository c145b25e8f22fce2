use std::ops::{Add, Mul, Neg, Not, Sub};

/// Handle to an integer decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVar(pub(crate) usize);

/// Handle to a 0/1 decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolVar(pub(crate) usize);

/// A boolean variable or its negation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Literal {
    pub(crate) var: usize,
    pub(crate) positive: bool,
}

/// Handle to an interval registered in a [`CpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalVar(pub(crate) usize);

impl BoolVar {
    pub fn as_int(self) -> IntVar {
        IntVar(self.0)
    }
}

impl From<BoolVar> for IntVar {
    fn from(value: BoolVar) -> Self {
        value.as_int()
    }
}

impl From<BoolVar> for Literal {
    fn from(value: BoolVar) -> Self {
        Literal {
            var: value.0,
            positive: true,
        }
    }
}

impl Not for BoolVar {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.0,
            positive: false,
        }
    }
}

impl Not for Literal {
    type Output = Literal;

    fn not(self) -> Literal {
        Literal {
            var: self.var,
            positive: !self.positive,
        }
    }
}

/// `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    pub(crate) terms: Vec<(usize, i64)>,
    pub(crate) constant: i64,
}

impl LinearExpr {
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn term(var: impl Into<IntVar>, coef: i64) -> Self {
        Self::default().add_term(var, coef)
    }

    pub fn sum<I, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IntVar>,
    {
        vars.into_iter()
            .fold(Self::default(), |expr, var| expr.add_term(var, 1))
    }

    pub fn weighted_sum<I, V>(terms: I) -> Self
    where
        I: IntoIterator<Item = (V, i64)>,
        V: Into<IntVar>,
    {
        terms
            .into_iter()
            .fold(Self::default(), |expr, (var, coef)| expr.add_term(var, coef))
    }

    pub fn add_term(mut self, var: impl Into<IntVar>, coef: i64) -> Self {
        if coef != 0 {
            self.terms.push((var.into().0, coef));
        }
        self
    }

    /// Merges repeated variables and drops zero coefficients.
    pub(crate) fn normalized(&self) -> Vec<(usize, i64)> {
        let mut merged: Vec<(usize, i64)> = Vec::with_capacity(self.terms.len());
        for &(var, coef) in &self.terms {
            match merged.iter_mut().find(|(v, _)| *v == var) {
                Some(entry) => entry.1 += coef,
                None => merged.push((var, coef)),
            }
        }
        merged.retain(|(_, coef)| *coef != 0);
        merged
    }
}

impl From<IntVar> for LinearExpr {
    fn from(value: IntVar) -> Self {
        LinearExpr::term(value, 1)
    }
}

impl From<BoolVar> for LinearExpr {
    fn from(value: BoolVar) -> Self {
        LinearExpr::term(value, 1)
    }
}

impl From<i64> for LinearExpr {
    fn from(value: i64) -> Self {
        LinearExpr::constant(value)
    }
}

impl<T: Into<LinearExpr>> Add<T> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: T) -> LinearExpr {
        let rhs = rhs.into();
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl<T: Into<LinearExpr>> Sub<T> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        self + (-rhs.into())
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        LinearExpr {
            terms: self.terms.into_iter().map(|(v, c)| (v, -c)).collect(),
            constant: -self.constant,
        }
    }
}

impl<T: Into<LinearExpr>> Add<T> for IntVar {
    type Output = LinearExpr;

    fn add(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) + rhs
    }
}

impl<T: Into<LinearExpr>> Sub<T> for IntVar {
    type Output = LinearExpr;

    fn sub(self, rhs: T) -> LinearExpr {
        LinearExpr::from(self) - rhs
    }
}

impl Mul<i64> for IntVar {
    type Output = LinearExpr;

    fn mul(self, rhs: i64) -> LinearExpr {
        LinearExpr::term(self, rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Le,
    Ge,
    Eq,
}

/// A linear constraint, optionally enforced only when every literal in its
/// enforcement list holds.
#[derive(Debug, Clone)]
pub struct Linear {
    expr: LinearExpr,
    cmp: Comparison,
    enforcement: Vec<Literal>,
}

impl Linear {
    fn new(lhs: LinearExpr, rhs: LinearExpr, cmp: Comparison) -> Self {
        Self {
            expr: lhs - rhs,
            cmp,
            enforcement: Vec::new(),
        }
    }

    pub fn le(lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> Self {
        Self::new(lhs.into(), rhs.into(), Comparison::Le)
    }

    pub fn ge(lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> Self {
        Self::new(lhs.into(), rhs.into(), Comparison::Ge)
    }

    pub fn eq(lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) -> Self {
        Self::new(lhs.into(), rhs.into(), Comparison::Eq)
    }

    pub fn only_enforce_if<I, L>(mut self, literals: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        self.enforcement
            .extend(literals.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone)]
pub(crate) struct VarDef {
    pub(crate) lb: i64,
    pub(crate) ub: i64,
    pub(crate) name: String,
}

#[derive(Debug, Clone)]
pub(crate) struct IntervalDef {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) presence: Option<Literal>,
    pub(crate) name: String,
}

#[derive(Debug, Clone)]
pub(crate) enum Constraint {
    /// `Σ coef·var ≤ rhs` when all enforcement literals hold.
    LinearLe {
        terms: Vec<(usize, i64)>,
        rhs: i64,
        enforcement: Vec<Literal>,
    },
    BoolOr(Vec<Literal>),
    ExactlyOne(Vec<Literal>),
    MaxEquality {
        target: usize,
        vars: Vec<usize>,
    },
    NoOverlap(Vec<usize>),
}

/// Constraint model: variables, intervals, constraints and an optional
/// minimization objective.
#[derive(Debug, Clone)]
pub struct CpModel {
    name: String,
    pub(crate) vars: Vec<VarDef>,
    pub(crate) intervals: Vec<IntervalDef>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Option<LinearExpr>,
}

impl CpModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            intervals: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn new_int_var(&mut self, lb: i64, ub: i64, name: impl Into<String>) -> IntVar {
        self.vars.push(VarDef {
            lb,
            ub,
            name: name.into(),
        });
        IntVar(self.vars.len() - 1)
    }

    pub fn new_constant(&mut self, value: i64) -> IntVar {
        self.new_int_var(value, value, format!("const_{value}"))
    }

    pub fn new_bool_var(&mut self, name: impl Into<String>) -> BoolVar {
        BoolVar(self.new_int_var(0, 1, name).0)
    }

    /// Mandatory interval; posts `end = start + size`.
    pub fn new_interval(
        &mut self,
        start: IntVar,
        size: IntVar,
        end: IntVar,
        name: impl Into<String>,
    ) -> IntervalVar {
        self.push_interval(start, size, end, None, name.into())
    }

    /// Interval that only exists when `presence` holds; `end = start + size`
    /// is enforced by the same literal.
    pub fn new_optional_interval(
        &mut self,
        start: IntVar,
        size: IntVar,
        end: IntVar,
        presence: impl Into<Literal>,
        name: impl Into<String>,
    ) -> IntervalVar {
        self.push_interval(start, size, end, Some(presence.into()), name.into())
    }

    pub fn new_fixed_interval(
        &mut self,
        start: i64,
        size: i64,
        name: impl Into<String>,
    ) -> IntervalVar {
        let start_var = self.new_constant(start);
        let size_var = self.new_constant(size);
        let end_var = self.new_constant(start + size);
        self.push_interval(start_var, size_var, end_var, None, name.into())
    }

    fn push_interval(
        &mut self,
        start: IntVar,
        size: IntVar,
        end: IntVar,
        presence: Option<Literal>,
        name: String,
    ) -> IntervalVar {
        let link = Linear::eq(end, start + size).only_enforce_if(presence);
        self.add(link);
        self.intervals.push(IntervalDef {
            start: start.0,
            end: end.0,
            presence,
            name,
        });
        IntervalVar(self.intervals.len() - 1)
    }

    pub fn add(&mut self, constraint: Linear) {
        let terms = constraint.expr.normalized();
        let rhs = -constraint.expr.constant;
        let enforcement = constraint.enforcement;
        let neg = |terms: &[(usize, i64)]| -> Vec<(usize, i64)> { terms.iter().map(|&(v, c)| (v, -c)).collect() };
        match constraint.cmp {
            Comparison::Le => self.constraints.push(Constraint::LinearLe {
                terms,
                rhs,
                enforcement,
            }),
            Comparison::Ge => self.constraints.push(Constraint::LinearLe {
                terms: neg(&terms),
                rhs: -rhs,
                enforcement,
            }),
            Comparison::Eq => {
                self.constraints.push(Constraint::LinearLe {
                    terms: neg(&terms),
                    rhs: -rhs,
                    enforcement: enforcement.clone(),
                });
                self.constraints.push(Constraint::LinearLe {
                    terms,
                    rhs,
                    enforcement,
                });
            }
        }
    }

    pub fn add_bool_or<I, L>(&mut self, literals: I)
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        let literals = literals.into_iter().map(Into::into).collect();
        self.constraints.push(Constraint::BoolOr(literals));
    }

    pub fn add_exactly_one<I, L>(&mut self, literals: I)
    where
        I: IntoIterator<Item = L>,
        L: Into<Literal>,
    {
        let literals = literals.into_iter().map(Into::into).collect();
        self.constraints.push(Constraint::ExactlyOne(literals));
    }

    /// `target = max(vars)`.
    pub fn add_max_equality<I>(&mut self, target: IntVar, vars: I)
    where
        I: IntoIterator<Item = IntVar>,
    {
        let vars = vars.into_iter().map(|v| v.0).collect();
        self.constraints.push(Constraint::MaxEquality {
            target: target.0,
            vars,
        });
    }

    pub fn add_no_overlap<I>(&mut self, intervals: I)
    where
        I: IntoIterator<Item = IntervalVar>,
    {
        let intervals: Vec<usize> = intervals.into_iter().map(|i| i.0).collect();
        if intervals.len() > 1 {
            self.constraints.push(Constraint::NoOverlap(intervals));
        }
    }

    pub fn minimize(&mut self, objective: impl Into<LinearExpr>) {
        self.objective = Some(objective.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_constraint_is_split_into_two_inequalities() {
        let mut model = CpModel::new("test");
        let x = model.new_int_var(0, 10, "x");
        let y = model.new_int_var(0, 10, "y");
        model.add(Linear::eq(x, y + 3i64));
        assert_eq!(model.constraint_count(), 2);
    }

    #[test]
    fn interval_posts_its_length_link() {
        let mut model = CpModel::new("test");
        let start = model.new_int_var(0, 10, "s");
        let size = model.new_constant(3);
        let end = model.new_int_var(0, 13, "e");
        model.new_interval(start, size, end, "i");
        assert_eq!(model.interval_count(), 1);
        assert_eq!(model.constraint_count(), 2);
    }

    #[test]
    fn normalized_merges_repeated_terms() {
        let mut model = CpModel::new("test");
        let x = model.new_int_var(0, 10, "x");
        let expr = x + x - LinearExpr::term(x, 2) + 4i64;
        assert!(expr.normalized().is_empty());
        assert_eq!(expr.constant, 4);
    }
}
