use std::fmt::Write;

use super::cnf::Lit;
use super::pwcnf::Formula;

/// Serializes in the PWCNF dialect. Hard clauses carry the top weight and
/// keep the partition they were read with.
pub fn to_pwcnf(f: &Formula) -> String {
    let mut out = String::new();
    for c in f.comments() {
        out.push_str(c);
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "p pwcnf {} {} {} {}",
        f.num_vars(),
        f.hard().len() + f.soft().len(),
        f.top_weight(),
        f.num_partitions().saturating_sub(1)
    );
    for (clause, partition) in f.hard_with_partitions() {
        let _ = write!(out, "{} {} ", partition, f.top_weight());
        push_lits(&mut out, clause);
    }
    for s in f.soft() {
        let _ = write!(out, "{} {} ", s.partition, s.weight);
        push_lits(&mut out, &s.clause);
    }
    out
}

/// Serializes as plain weighted CNF, dropping partition indices.
pub fn to_wcnf(f: &Formula) -> String {
    let mut out = String::new();
    for c in f.comments() {
        out.push_str(c);
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "p wcnf {} {} {}",
        f.num_vars(),
        f.hard().len() + f.soft().len(),
        f.top_weight()
    );
    for clause in f.hard() {
        let _ = write!(out, "{} ", f.top_weight());
        push_lits(&mut out, clause);
    }
    for s in f.soft() {
        let _ = write!(out, "{} ", s.weight);
        push_lits(&mut out, &s.clause);
    }
    out
}

fn push_lits(out: &mut String, clause: &[Lit]) {
    for &lit in clause {
        let _ = write!(out, "{} ", lit);
    }
    out.push_str("0\n");
}
