use log::trace;

use super::cnf::{Clause, Lit, MAX_VAR};
use super::pwcnf::{SoftClause, TopWeight};
use crate::error::FormatErrorKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Hard clauses paired with the partition of the clause they came from.
    pub hard: Vec<(Clause, usize)>,
    pub soft: Vec<SoftClause>,
    pub selectors: u32,
}

/// Rewrites clauses declared with a non-positive weight `w` into the
/// positive-weight form where the *negation* of the clause costs `-w`.
///
/// A unit clause `[l]` becomes the soft unit `[-l]`. A longer clause gets a
/// fresh selector `s` with `s <-> clause`, and `[-s]` carries the weight.
/// A derived unit whose weight reaches `top` is hard instead. Zero weights
/// and empty clauses contribute nothing and are dropped. Fails when a
/// selector would need an id above [`MAX_VAR`].
pub fn normalize_negative_weights(
    negatives: Vec<SoftClause>,
    num_vars: &mut u32,
    top: &TopWeight,
) -> Result<Normalized, FormatErrorKind> {
    let mut out = Normalized::default();

    for neg in negatives {
        let weight = -neg.weight;
        if weight.is_zero() || neg.clause.is_empty() {
            continue;
        }

        let sel = if neg.clause.len() == 1 {
            neg.clause[0]
        } else {
            *num_vars = num_vars
                .checked_add(1)
                .filter(|&v| v <= MAX_VAR)
                .ok_or(FormatErrorKind::TooManyVariables(MAX_VAR))?;
            out.selectors += 1;
            let s = Lit::pos(*num_vars);

            // l -> s
            for &l in &neg.clause {
                out.hard.push((vec![s, l.neg()], neg.partition));
            }
            // s -> clause
            let mut back = Vec::with_capacity(neg.clause.len() + 1);
            back.push(s.neg());
            back.extend_from_slice(&neg.clause);
            out.hard.push((back, neg.partition));
            trace!("selector {} for clause of width {}", s, neg.clause.len());
            s
        };

        let unit = vec![sel.neg()];
        if top.admits_soft(&weight) {
            out.soft.push(SoftClause {
                clause: unit,
                weight,
                partition: neg.partition,
            });
        } else {
            out.hard.push((unit, neg.partition));
        }
    }

    Ok(out)
}
