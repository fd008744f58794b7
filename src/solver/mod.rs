pub mod dpll_backend;
pub mod varisat;

use crate::cnf::cnf::Lit;
use crate::error::SolveError;

use self::dpll_backend::DpllSolverBackend;
use self::varisat::VarisatSolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveResult {
    Sat,
    Unsat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    pub solve_calls: usize,
    pub sat_answers: usize,
    pub unsat_answers: usize,
}

impl SolverStats {
    pub(crate) fn record(&mut self, result: SolveResult) {
        self.solve_calls += 1;
        match result {
            SolveResult::Sat => self.sat_answers += 1,
            SolveResult::Unsat => self.unsat_answers += 1,
        }
    }
}

/// Assumption-based incremental SAT oracle. Clauses are only ever added.
pub trait IncrementalSolver {
    fn new_var(&mut self) -> u32;
    fn num_vars(&self) -> u32;
    fn add_clause(&mut self, clause: Vec<Lit>);
    fn solve(&mut self, assumptions: &[Lit]) -> Result<SolveResult, SolveError>;
    /// Valid after `Sat`.
    fn model_value(&self, var: u32) -> Option<bool>;
    /// Subset of the last assumptions that conflicts with the clauses.
    /// Valid after `Unsat`; empty when the clauses alone are unsatisfiable.
    fn core(&self) -> Option<Vec<Lit>>;
    fn stats(&self) -> SolverStats;
    fn backend_name(&self) -> &'static str;

    fn reserve_vars(&mut self, n: u32) {
        while self.num_vars() < n {
            self.new_var();
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Backend {
    #[default]
    Varisat,
    Dpll,
}

impl Backend {
    pub fn name(self) -> &'static str {
        match self {
            Backend::Varisat => "varisat",
            Backend::Dpll => "dpll",
        }
    }

    pub fn parse(s: &str) -> Option<Backend> {
        match s {
            "varisat" => Some(Backend::Varisat),
            "dpll" => Some(Backend::Dpll),
            _ => None,
        }
    }

    pub fn create(self) -> Box<dyn IncrementalSolver> {
        match self {
            Backend::Varisat => Box::new(VarisatSolver::new()),
            Backend::Dpll => Box::new(DpllSolverBackend::new()),
        }
    }
}

/// Deletion-based shrinking: drops every literal whose removal keeps the
/// remaining assumptions unsatisfiable. Leaves the solver in an `Unsat`
/// state for the returned core.
pub fn minimize_core<S: IncrementalSolver + ?Sized>(
    solver: &mut S,
    core: Vec<Lit>,
) -> Result<Vec<Lit>, SolveError> {
    let mut kept = core;
    let mut idx = 0usize;
    while idx < kept.len() {
        let mut trial = kept.clone();
        trial.remove(idx);
        match solver.solve(&trial)? {
            SolveResult::Unsat => {
                // the solver's own core may be smaller still
                let shrunk = solver.core().unwrap_or(trial);
                kept = kept
                    .iter()
                    .copied()
                    .filter(|l| shrunk.contains(l))
                    .collect();
            }
            SolveResult::Sat => idx += 1,
        }
    }
    // re-establish the unsat state for `kept`
    solver.solve(&kept)?;
    Ok(kept)
}
