pub mod cnf;
pub mod dimacs;
pub mod pwcnf;
pub mod tseitin;
pub mod weight;

pub use cnf::{Clause, Lit};
pub use pwcnf::{Dialect, Formula, FormulaBuilder, ParseOptions, SoftClause, TopWeight};
pub use weight::Weight;
