use crate::cnf::cnf::{Cnf, Lit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    /// Total model indexed by variable; index 0 is unused.
    Sat(Vec<bool>),
    Unsat,
}

pub fn solve(cnf: &Cnf) -> SatResult {
    solve_with_assumptions(cnf, &[])
}

/// Searches for a model in which every assumption literal holds.
pub fn solve_with_assumptions(cnf: &Cnf, assumptions: &[Lit]) -> SatResult {
    let max_assumed = assumptions.iter().map(|l| l.var).max().unwrap_or(0);
    let width = cnf.num_vars.max(max_assumed) as usize + 1;
    let mut assignment = vec![None; width];

    for &a in assumptions {
        let slot = &mut assignment[a.var as usize];
        match *slot {
            Some(v) if v != a.sign => return SatResult::Unsat,
            _ => *slot = Some(a.sign),
        }
    }

    if search(cnf, &mut assignment) {
        // fill free vars deterministically
        let model = assignment
            .into_iter()
            .map(|v| v.unwrap_or(false))
            .collect::<Vec<_>>();
        SatResult::Sat(model)
    } else {
        SatResult::Unsat
    }
}

pub fn is_sat(cnf: &Cnf) -> bool {
    matches!(solve(cnf), SatResult::Sat(_))
}

pub fn is_sat_under(cnf: &Cnf, assumptions: &[Lit]) -> bool {
    matches!(solve_with_assumptions(cnf, assumptions), SatResult::Sat(_))
}

fn search(cnf: &Cnf, assignment: &mut [Option<bool>]) -> bool {
    if !unit_propagate(cnf, assignment) {
        return false;
    }
    match cnf.eval_formula_partial(assignment) {
        Some(true) => return true,
        Some(false) => return false,
        None => {}
    }

    let Some(var) = first_unassigned(assignment) else {
        return false;
    };

    // false first keeps unconstrained relaxation-style vars low
    for value in [false, true] {
        let mut attempt = assignment.to_vec();
        attempt[var] = Some(value);
        if search(cnf, &mut attempt) {
            assignment.copy_from_slice(&attempt);
            return true;
        }
    }

    false
}

fn unit_propagate(cnf: &Cnf, assignment: &mut [Option<bool>]) -> bool {
    loop {
        let mut changed = false;

        for clause in &cnf.clauses {
            let mut open_count = 0usize;
            let mut last_open = Lit::new(0, true);
            let mut has_true = false;

            for &lit in clause {
                match Cnf::eval_lit_partial(lit, assignment) {
                    Some(true) => {
                        has_true = true;
                        break;
                    }
                    Some(false) => {}
                    None => {
                        open_count += 1;
                        last_open = lit;
                    }
                }
            }

            if has_true {
                continue;
            }
            if open_count == 0 {
                return false;
            }
            if open_count == 1 {
                let var = last_open.var as usize;
                match assignment[var] {
                    Some(v) if v != last_open.sign => return false,
                    Some(_) => {}
                    None => {
                        assignment[var] = Some(last_open.sign);
                        changed = true;
                    }
                }
            }
        }

        if !changed {
            return true;
        }
    }
}

fn first_unassigned(assignment: &[Option<bool>]) -> Option<usize> {
    (1..assignment.len()).find(|&i| assignment[i].is_none())
}
