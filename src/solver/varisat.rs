use crate::cnf::cnf::Lit;
use crate::error::SolveError;
use crate::solver::{IncrementalSolver, SolveResult, SolverStats};
use varisat::ExtendFormula;

pub struct VarisatSolver {
    inner: varisat::Solver<'static>,
    vars: Vec<varisat::Var>,
    last_model: Option<Vec<bool>>,
    last_core: Option<Vec<Lit>>,
    stats: SolverStats,
}

impl VarisatSolver {
    pub fn new() -> Self {
        Self {
            inner: varisat::Solver::new(),
            vars: Vec::new(),
            last_model: None,
            last_core: None,
            stats: SolverStats::default(),
        }
    }

    fn to_lit(&mut self, lit: Lit) -> varisat::Lit {
        self.reserve_vars(lit.var);
        let var = self.vars[lit.var as usize - 1];
        varisat::Lit::from_var(var, lit.sign)
    }

    fn from_lit(&self, lit: varisat::Lit) -> Option<Lit> {
        let idx = lit.var().index();
        if self.vars.get(idx) != Some(&lit.var()) {
            return None;
        }
        let var = u32::try_from(idx + 1).ok()?;
        Some(Lit::new(var, lit.is_positive()))
    }
}

impl Default for VarisatSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalSolver for VarisatSolver {
    fn new_var(&mut self) -> u32 {
        let v = self.inner.new_var();
        self.vars.push(v);
        self.vars.len() as u32
    }

    fn num_vars(&self) -> u32 {
        self.vars.len() as u32
    }

    fn add_clause(&mut self, clause: Vec<Lit>) {
        let lits = clause
            .into_iter()
            .filter(|l| l.var != 0)
            .map(|l| self.to_lit(l))
            .collect::<Vec<_>>();
        self.inner.add_clause(&lits);
    }

    fn solve(&mut self, assumptions: &[Lit]) -> Result<SolveResult, SolveError> {
        let assumps = assumptions
            .iter()
            .copied()
            .filter(|l| l.var != 0)
            .map(|l| self.to_lit(l))
            .collect::<Vec<_>>();
        self.inner.assume(&assumps);
        self.last_model = None;
        self.last_core = None;

        let result = match self.inner.solve() {
            Ok(true) => {
                let mut model = vec![false; self.vars.len() + 1];
                for lit in self.inner.model().unwrap_or_default() {
                    if let Some(l) = self.from_lit(lit) {
                        model[l.var as usize] = l.sign;
                    }
                }
                self.last_model = Some(model);
                SolveResult::Sat
            }
            Ok(false) => {
                let failed = self.inner.failed_core().unwrap_or(&[]).to_vec();
                let core = failed
                    .into_iter()
                    .filter_map(|l| self.from_lit(l))
                    .collect::<Vec<_>>();
                self.last_core = Some(core);
                SolveResult::Unsat
            }
            Err(e) => return Err(SolveError::Oracle(e.to_string())),
        };
        self.stats.record(result);
        Ok(result)
    }

    fn model_value(&self, var: u32) -> Option<bool> {
        let idx = var as usize;
        self.last_model
            .as_ref()
            .and_then(|m| if idx > 0 && idx < m.len() { Some(m[idx]) } else { None })
    }

    fn core(&self) -> Option<Vec<Lit>> {
        self.last_core.clone()
    }

    fn stats(&self) -> SolverStats {
        self.stats
    }

    fn backend_name(&self) -> &'static str {
        "varisat"
    }
}
