/// demonstrations of formula parsing, balancing, mass calculation and cancellation
pub mod stoichiometry_examples;
