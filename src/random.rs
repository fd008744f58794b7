use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cnf::cnf::{Clause, Lit};
use crate::cnf::pwcnf::{Formula, FormulaBuilder, TopWeight};
use crate::cnf::weight::Weight;
use crate::error::FormatErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomShape {
    pub vars: u32,
    pub hard: usize,
    pub soft: usize,
    pub partitions: usize,
    pub max_width: usize,
    pub max_weight: i64,
    /// Share of soft clauses, in percent, declared with a negative weight.
    pub negative_pct: u32,
}

impl Default for RandomShape {
    fn default() -> Self {
        Self {
            vars: 8,
            hard: 6,
            soft: 10,
            partitions: 3,
            max_width: 3,
            max_weight: 9,
            negative_pct: 0,
        }
    }
}

/// Seeded random PWCNF instance. Hard clauses are planted on a hidden
/// assignment so the instance is always feasible.
pub fn random_formula(shape: &RandomShape, seed: u64) -> Result<Formula, FormatErrorKind> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let vars = shape.vars.max(1);
    let width = shape.max_width.max(1);
    let max_weight = shape.max_weight.max(1);
    let buckets = shape.partitions.max(1);
    let planted = (0..=vars).map(|_| rng.random::<bool>()).collect::<Vec<_>>();

    let top = TopWeight::Finite(Weight::from_int(max_weight + 1));
    let mut builder = FormulaBuilder::new(top).with_partitions(buckets + 1);
    builder.comment(format!("c random pwcnf seed={} vars={}", seed, vars));

    for _ in 0..shape.hard {
        let mut clause = random_clause(&mut rng, vars, width);
        if !clause.iter().any(|l| l.eval(&planted)) {
            let pick = rng.random_range(0..clause.len());
            clause[pick] = clause[pick].neg();
        }
        let partition = rng.random_range(1..=buckets);
        builder.add_hard(clause, partition);
    }

    for _ in 0..shape.soft {
        let clause = random_clause(&mut rng, vars, width);
        let mut weight = rng.random_range(1..=max_weight);
        if rng.random_range(0..100) < shape.negative_pct {
            weight = -weight;
        }
        let partition = rng.random_range(1..=buckets);
        builder.add_clause(clause, Weight::from_int(weight), partition);
    }

    builder.build()
}

fn random_clause(rng: &mut ChaCha8Rng, vars: u32, width: usize) -> Clause {
    let len = rng.random_range(1..=width);
    let mut clause = Vec::<Lit>::with_capacity(len);
    while clause.len() < len {
        let var = rng.random_range(1..=vars);
        if clause.iter().any(|l| l.var == var) {
            if clause.len() as u32 >= vars {
                break;
            }
            continue;
        }
        clause.push(Lit::new(var, rng.random::<bool>()));
    }
    clause
}
