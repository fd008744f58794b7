use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit {
    pub var: u32,
    pub sign: bool,
}

pub type Clause = Vec<Lit>;

/// Largest variable id a formula may use; the DIMACS convention of a
/// positive `i32`.
pub const MAX_VAR: u32 = i32::MAX as u32;

impl Lit {
    pub fn new(var: u32, sign: bool) -> Self {
        Self { var, sign }
    }

    pub fn pos(var: u32) -> Self {
        Self::new(var, true)
    }

    pub fn neg(self) -> Self {
        Self {
            var: self.var,
            sign: !self.sign,
        }
    }

    /// `None` for 0 or for magnitudes above [`MAX_VAR`].
    pub fn from_dimacs(value: i64) -> Option<Self> {
        if value == 0 || value.unsigned_abs() > u64::from(MAX_VAR) {
            return None;
        }
        let var = u32::try_from(value.unsigned_abs()).ok()?;
        Some(Self::new(var, value > 0))
    }

    pub fn to_dimacs(self) -> i64 {
        let v = i64::from(self.var);
        if self.sign { v } else { -v }
    }

    /// Value of the literal under a total assignment indexed by variable.
    pub fn eval(self, model: &[bool]) -> bool {
        let value = model.get(self.var as usize).copied().unwrap_or(false);
        value == self.sign
    }
}

impl fmt::Display for Lit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

pub fn clause_from_dimacs(lits: &[i64]) -> Option<Clause> {
    lits.iter().map(|&l| Lit::from_dimacs(l)).collect()
}

pub fn clause_is_satisfied(clause: &[Lit], model: &[bool]) -> bool {
    clause.iter().any(|&l| l.eval(model))
}

/// Plain clause store used by the exhaustive backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cnf {
    pub num_vars: u32,
    pub clauses: Vec<Clause>,
}

impl Cnf {
    pub fn new(num_vars: u32) -> Self {
        Self {
            num_vars,
            clauses: Vec::new(),
        }
    }

    pub fn add_clause(&mut self, clause: Clause) {
        if let Some(max) = clause.iter().map(|l| l.var).max() {
            self.num_vars = self.num_vars.max(max);
        }
        self.clauses.push(clause);
    }

    pub fn fresh_var(&mut self) -> u32 {
        self.num_vars = self.num_vars.saturating_add(1);
        self.num_vars
    }

    pub fn eval_lit_partial(lit: Lit, assignment: &[Option<bool>]) -> Option<bool> {
        let var = lit.var as usize;
        if var >= assignment.len() {
            return None;
        }
        assignment[var].map(|v| if lit.sign { v } else { !v })
    }

    pub fn eval_clause_partial(clause: &[Lit], assignment: &[Option<bool>]) -> Option<bool> {
        let mut any_unknown = false;
        for &lit in clause {
            match Self::eval_lit_partial(lit, assignment) {
                Some(true) => return Some(true),
                Some(false) => {}
                None => any_unknown = true,
            }
        }
        if any_unknown { None } else { Some(false) }
    }

    pub fn eval_formula_partial(&self, assignment: &[Option<bool>]) -> Option<bool> {
        let mut all_true = true;
        for clause in &self.clauses {
            match Self::eval_clause_partial(clause, assignment) {
                Some(true) => {}
                Some(false) => return Some(false),
                None => all_true = false,
            }
        }
        if all_true { Some(true) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimacs_literals_convert_both_ways() {
        let l = Lit::from_dimacs(-7).expect("lit");
        assert_eq!(l, Lit::new(7, false));
        assert_eq!(l.to_dimacs(), -7);
        assert_eq!(l.neg().to_string(), "7");
        assert!(Lit::from_dimacs(0).is_none());
        assert!(Lit::from_dimacs(i64::from(u32::MAX)).is_none());
        assert!(Lit::from_dimacs(-(i64::from(MAX_VAR) + 1)).is_none());
        assert_eq!(
            Lit::from_dimacs(i64::from(MAX_VAR)),
            Some(Lit::new(MAX_VAR, true))
        );
    }

    #[test]
    fn clause_eval_on_total_model() {
        // index 0 is unused
        let model = [false, true, false];
        let c = clause_from_dimacs(&[-1, 2]).expect("clause");
        assert!(!clause_is_satisfied(&c, &model));
        let c = clause_from_dimacs(&[-2]).expect("clause");
        assert!(clause_is_satisfied(&c, &model));
        assert!(!clause_is_satisfied(&[], &model));
    }

    #[test]
    fn add_clause_tracks_max_var() {
        let mut cnf = Cnf::new(1);
        cnf.add_clause(vec![Lit::new(4, true)]);
        assert_eq!(cnf.num_vars, 4);
        assert_eq!(cnf.fresh_var(), 5);
    }
}
