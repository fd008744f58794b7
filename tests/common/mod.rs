#![allow(dead_code)]

use uphitman::cnf::cnf::{Clause, clause_from_dimacs, clause_is_satisfied};
use uphitman::cnf::pwcnf::Formula;
use uphitman::cnf::weight::Weight;

pub fn c(lits: &[i64]) -> Clause {
    clause_from_dimacs(lits).expect("clause")
}

pub fn w(v: i64) -> Weight {
    Weight::from_int(v)
}

/// Every assignment over `n` variables, index 0 unused.
pub fn assignments(n: u32) -> impl Iterator<Item = Vec<bool>> {
    (0u64..(1u64 << n)).map(move |bits| {
        let mut a = vec![false; n as usize + 1];
        for v in 1..=n {
            a[v as usize] = (bits >> (v - 1)) & 1 == 1;
        }
        a
    })
}

/// Minimum normalized cost by enumeration, `None` when the hard clauses are
/// unsatisfiable.
pub fn brute_force(f: &Formula) -> Option<Weight> {
    assignments(f.num_vars())
        .filter(|a| f.hard().iter().all(|cl| clause_is_satisfied(cl, a)))
        .map(|a| cost_under(f, &a))
        .min()
}

pub fn cost_under(f: &Formula, a: &[bool]) -> Weight {
    f.soft()
        .iter()
        .filter(|s| !clause_is_satisfied(&s.clause, a))
        .map(|s| &s.weight)
        .sum()
}

/// Minimum over declared clauses `(lits, weight)`, negatives included, with
/// `hard` required to hold.
pub fn brute_force_declared(n: u32, hard: &[Clause], soft: &[(Clause, Weight)]) -> Option<Weight> {
    assignments(n)
        .filter(|a| hard.iter().all(|cl| clause_is_satisfied(cl, a)))
        .map(|a| {
            soft.iter()
                .filter(|(cl, _)| !clause_is_satisfied(cl, &a))
                .map(|(_, w)| w)
                .sum::<Weight>()
        })
        .min()
}
