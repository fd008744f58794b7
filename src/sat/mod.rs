pub mod dpll;
