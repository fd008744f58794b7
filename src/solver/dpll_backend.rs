use crate::cnf::cnf::{Cnf, Lit};
use crate::error::SolveError;
use crate::sat::dpll::{SatResult, is_sat_under, solve_with_assumptions};
use crate::solver::{IncrementalSolver, SolveResult, SolverStats};

/// Exhaustive in-memory oracle. Re-solves from scratch on every call and
/// returns subset-minimal cores, which makes it a reference for the
/// incremental backend on small formulas.
#[derive(Debug, Clone)]
pub struct DpllSolverBackend {
    cnf: Cnf,
    last_model: Option<Vec<bool>>,
    last_core: Option<Vec<Lit>>,
    stats: SolverStats,
}

impl DpllSolverBackend {
    pub fn new() -> Self {
        Self {
            cnf: Cnf::new(0),
            last_model: None,
            last_core: None,
            stats: SolverStats::default(),
        }
    }

    fn shrink_core(&self, assumptions: &[Lit]) -> Vec<Lit> {
        let mut core = assumptions.to_vec();
        let mut idx = 0usize;
        while idx < core.len() {
            let mut trial = core.clone();
            trial.remove(idx);
            if is_sat_under(&self.cnf, &trial) {
                idx += 1;
            } else {
                core = trial;
            }
        }
        core
    }
}

impl Default for DpllSolverBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalSolver for DpllSolverBackend {
    fn new_var(&mut self) -> u32 {
        self.cnf.fresh_var()
    }

    fn num_vars(&self) -> u32 {
        self.cnf.num_vars
    }

    fn add_clause(&mut self, clause: Vec<Lit>) {
        self.cnf.add_clause(clause);
    }

    fn solve(&mut self, assumptions: &[Lit]) -> Result<SolveResult, SolveError> {
        let result = match solve_with_assumptions(&self.cnf, assumptions) {
            SatResult::Sat(model) => {
                self.last_model = Some(model);
                self.last_core = None;
                SolveResult::Sat
            }
            SatResult::Unsat => {
                self.last_model = None;
                self.last_core = Some(self.shrink_core(assumptions));
                SolveResult::Unsat
            }
        };
        self.stats.record(result);
        Ok(result)
    }

    fn model_value(&self, var: u32) -> Option<bool> {
        let idx = var as usize;
        self.last_model
            .as_ref()
            .and_then(|m| if idx < m.len() { Some(m[idx]) } else { None })
    }

    fn core(&self) -> Option<Vec<Lit>> {
        self.last_core.clone()
    }

    fn stats(&self) -> SolverStats {
        self.stats
    }

    fn backend_name(&self) -> &'static str {
        "dpll"
    }
}
