use std::ops::Range;

use log::{debug, info, trace};

use crate::cnf::cnf::{Lit, MAX_VAR, clause_is_satisfied};
use crate::cnf::pwcnf::Formula;
use crate::cnf::weight::Weight;
use crate::error::SolveError;
use crate::hitting::{Core, ExactHitter, HittingSetOracle};
use crate::solver::{Backend, IncrementalSolver, SolveResult, minimize_core};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Soft clauses enter the oracle one partition bucket at a time.
    #[default]
    Partitioned,
    /// All soft clauses at once.
    Flat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveOptions {
    pub mode: Mode,
    pub backend: Backend,
    /// Shrink every core to a subset-minimal one before recording it.
    pub minimize_cores: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub sat_calls: usize,
    pub hs_calls: usize,
    pub cores: usize,
    pub stages: usize,
    pub relaxation_vars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Total weight of the soft clauses the model falsifies.
    pub cost: Weight,
    /// Assignment to the formula's variables; relaxation variables excluded.
    pub model: Vec<Lit>,
    pub stats: SolveStats,
}

impl Solution {
    pub fn model_dimacs(&self) -> Vec<i64> {
        self.model.iter().map(|l| l.to_dimacs()).collect()
    }

    /// Cost under the weights as declared, before negative weights were
    /// normalized away.
    pub fn declared_cost(&self, formula: &Formula) -> Weight {
        &self.cost + formula.offset()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Optimum(Solution),
    /// The hard clauses alone are unsatisfiable.
    Infeasible,
}

impl Outcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Outcome::Optimum(s) => Some(s),
            Outcome::Infeasible => None,
        }
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, Outcome::Infeasible)
    }
}

pub fn solve(formula: &Formula, options: SolveOptions) -> Result<Outcome, SolveError> {
    UpHitman::new(formula, options).solve()
}

#[derive(Debug, Clone)]
struct Relaxation {
    soft_index: usize,
    weight: Weight,
}

/// Implicit hitting set solver over one formula.
///
/// Both oracles are mutated incrementally: clauses and cores are only ever
/// added, so the instance is consumed by a single solve.
pub struct UpHitman<'f> {
    formula: &'f Formula,
    sat: Box<dyn IncrementalSolver>,
    hitter: Box<dyn HittingSetOracle>,
    options: SolveOptions,
    first_relax: u32,
    // indexed by relaxation var - first_relax
    relax: Vec<Relaxation>,
    stats: SolveStats,
}

impl<'f> UpHitman<'f> {
    pub fn new(formula: &'f Formula, options: SolveOptions) -> Self {
        Self::with_oracles(
            formula,
            options.backend.create(),
            Box::new(ExactHitter::new()),
            options,
        )
    }

    /// Seeds `sat` with the hard clauses. `sat` must not hold any clauses
    /// over variables above the formula's.
    pub fn with_oracles(
        formula: &'f Formula,
        mut sat: Box<dyn IncrementalSolver>,
        hitter: Box<dyn HittingSetOracle>,
        options: SolveOptions,
    ) -> Self {
        sat.reserve_vars(formula.num_vars());
        for clause in formula.hard() {
            sat.add_clause(clause.clone());
        }
        // past MAX_VAR only if the ids run out, which `solve` reports
        let first_relax = sat.num_vars().saturating_add(1);
        Self {
            formula,
            sat,
            hitter,
            options,
            first_relax,
            relax: Vec::with_capacity(formula.soft().len()),
            stats: SolveStats::default(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.sat.backend_name()
    }

    pub fn solve(self) -> Result<Outcome, SolveError> {
        match self.options.mode {
            Mode::Partitioned => self.compute_with_partitions(),
            Mode::Flat => self.compute_without_partitions(),
        }
    }

    pub fn compute_with_partitions(mut self) -> Result<Outcome, SolveError> {
        self.check_capacity()?;
        let formula = self.formula;
        for (idx, range) in formula.partition_ranges() {
            self.relax_range(range.clone());
            self.stats.stages += 1;
            if !self.converge()? {
                info!("hard clauses are unsatisfiable");
                return Ok(Outcome::Infeasible);
            }
            debug!(
                "partition {}: {} soft clauses relaxed, {} cores recorded",
                idx,
                self.relax.len(),
                self.hitter.num_cores()
            );
        }

        // no soft clauses at all: still need a model of the hard part
        if self.stats.stages == 0 {
            self.stats.stages = 1;
            if !self.converge()? {
                info!("hard clauses are unsatisfiable");
                return Ok(Outcome::Infeasible);
            }
        }
        self.finish()
    }

    pub fn compute_without_partitions(mut self) -> Result<Outcome, SolveError> {
        self.check_capacity()?;
        self.relax_range(0..self.formula.soft().len());
        self.stats.stages = 1;
        if !self.converge()? {
            info!("hard clauses are unsatisfiable");
            return Ok(Outcome::Infeasible);
        }
        self.finish()
    }

    /// One relaxation variable per soft clause must fit below `MAX_VAR`.
    fn check_capacity(&self) -> Result<(), SolveError> {
        let last = u64::from(self.sat.num_vars()) + self.formula.soft().len() as u64;
        if last > u64::from(MAX_VAR) {
            return Err(SolveError::TooManyVariables(last));
        }
        Ok(())
    }

    fn relax_range(&mut self, range: Range<usize>) {
        let soft = self.formula.soft();
        for idx in range {
            let r = self.sat.new_var();
            debug_assert_eq!(r, self.first_relax + self.relax.len() as u32);
            let mut clause = Vec::with_capacity(soft[idx].clause.len() + 1);
            clause.extend_from_slice(&soft[idx].clause);
            clause.push(Lit::new(r, false));
            self.sat.add_clause(clause);
            self.relax.push(Relaxation {
                soft_index: idx,
                weight: soft[idx].weight.clone(),
            });
        }
    }

    fn relax_index(&self, var: u32) -> Option<usize> {
        let idx = var.checked_sub(self.first_relax)? as usize;
        (idx < self.relax.len()).then_some(idx)
    }

    /// Alternates hitting set and SAT calls until the soft clauses outside
    /// the current hitting set are satisfiable together. `false` means no
    /// assumption is to blame: the hard clauses are unsatisfiable.
    fn converge(&mut self) -> Result<bool, SolveError> {
        loop {
            let hs = self.hitter.get();
            self.stats.hs_calls += 1;

            let mut excluded = vec![false; self.relax.len()];
            for &v in &hs {
                let idx = self.relax_index(v).ok_or_else(|| {
                    SolveError::Contract(format!("hitting set names unknown variable {}", v))
                })?;
                excluded[idx] = true;
            }

            let assumptions = (0..self.relax.len())
                .filter(|&i| !excluded[i])
                .map(|i| Lit::pos(self.first_relax + i as u32))
                .collect::<Vec<_>>();
            trace!(
                "hitting set of {} vars, {} assumptions",
                hs.len(),
                assumptions.len()
            );

            if self.sat.solve(&assumptions)? == SolveResult::Sat {
                return Ok(true);
            }

            let mut core = self.sat.core().ok_or_else(|| {
                SolveError::Contract("unsatisfiable answer without a core".to_owned())
            })?;
            if self.options.minimize_cores && core.len() > 1 {
                core = minimize_core(self.sat.as_mut(), core)?;
            }
            if core.is_empty() {
                return Ok(false);
            }

            let mut members = Vec::with_capacity(core.len());
            for lit in core {
                let idx = self
                    .relax_index(lit.var)
                    .filter(|&i| lit.sign && !excluded[i])
                    .ok_or_else(|| {
                        SolveError::Contract(format!("core literal {} was not assumed", lit))
                    })?;
                members.push((lit.var, self.relax[idx].weight.clone()));
            }
            trace!("core of size {}", members.len());
            self.hitter.hit(Core::new(members));
            self.stats.cores += 1;
        }
    }

    fn finish(self) -> Result<Outcome, SolveError> {
        let n = self.formula.num_vars();
        let mut values = vec![false; n as usize + 1];
        let mut model = Vec::with_capacity(n as usize);
        for var in 1..=n {
            let value = self.sat.model_value(var).unwrap_or(false);
            values[var as usize] = value;
            model.push(Lit::new(var, value));
        }

        let soft = self.formula.soft();
        let mut cost = Weight::zero();
        for r in &self.relax {
            if !clause_is_satisfied(&soft[r.soft_index].clause, &values) {
                cost += &r.weight;
            }
        }

        let mut stats = self.stats;
        stats.sat_calls = self.sat.stats().solve_calls;
        stats.relaxation_vars = self.relax.len();
        info!(
            "optimum {} after {} sat calls, {} cores, {} stages",
            cost, stats.sat_calls, stats.cores, stats.stages
        );
        Ok(Outcome::Optimum(Solution { cost, model, stats }))
    }
}
