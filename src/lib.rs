pub mod bench;
pub mod cnf;
pub mod error;
pub mod hitting;
pub mod ihs;
pub mod random;
pub mod sat;
pub mod solver;
