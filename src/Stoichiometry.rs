/// Standard atomic masses of all 118 elements, element symbol recognition.
pub mod periodic_table;
/// Error kinds of parsing, balancing and mass calculation.
pub mod errors;
/// eng
/// Parses a formula like `Ca(OH)2` or `H2O(g)` into element counts in first-seen order,
/// brackets are expanded recursively, phase marks are dropped. Also computes molar mass,
/// mass and atomic percents.
/// ----------------------------------------------------------------
/// # Examples
/// ```
/// use SynthCalc::Stoichiometry::formula_parser::ChemicalFormula;
/// let formula = ChemicalFormula::parse("Ca(OH)2").unwrap();
/// assert_eq!(formula.format(), "CaO2H2");
/// assert_eq!(formula.count("H"), 2);
/// ```
pub mod formula_parser;
/// Splits a reaction equation into reactants and products, reads coefficients written in
/// front of formulas and rejects equations whose sides are built from different elements.
pub mod equation_parser;
/// Element x compound matrix of a reaction, product columns negated.
pub mod stoich_matrix;
pub mod cancellation;
/// eng
/// Strategies that find the coefficients of a reaction from its stoichiometric matrix:
/// 1) inverse of the matrix augmented with a row fixing the last coefficient
/// 2) generalized pseudo-inverse: projection of (1, ..., 1) onto the null space
/// 3) partial pseudo-inverse: last coefficient fixed to 1, the rest by least squares
/// 4) combinatorial: exhaustive search of integer coefficients in [1, bound]
/// 5) auto: the four above in this order, first success wins
/// # Examples
/// ```
/// use SynthCalc::Stoichiometry::cancellation::CancellationToken;
/// use SynthCalc::Stoichiometry::equation_parser::ChemicalEquation;
/// use SynthCalc::Stoichiometry::solvers::{BalancingMethod, SolveContext, balance};
/// use SynthCalc::Stoichiometry::stoich_matrix::StoichiometricMatrix;
/// let equation = ChemicalEquation::parse("Fe + Cl2 = FeCl3").unwrap();
/// let matrix = StoichiometricMatrix::build(&equation);
/// let ctx = SolveContext::new(1e-8, CancellationToken::new());
/// let solution = balance(&matrix, BalancingMethod::Auto(15), &ctx).unwrap();
/// assert_eq!(solution.method, "inverse");
/// ```
pub mod solvers;
/// Scaling of real coefficients to the smallest integer ones.
pub mod normalizer;
/// Masses of reactants and products for a given mass of one compound.
pub mod masses;
pub mod report;
/// Request of one calculation and its selectors.
pub mod request;
/// eng
/// Sequences parsing, solving, normalization, mass scaling and formatting of one request
/// under a cancellation token; `BalancingEngine` serializes concurrent calls.
/// ----------------------------------------------------------------
/// # Examples
/// ```
/// use SynthCalc::Stoichiometry::engine::BalancingEngine;
/// use SynthCalc::Stoichiometry::request::Request;
/// let engine = BalancingEngine::new();
/// let result = engine.solve(&Request::new("H2 + O2 = H2O").with_target(2, 18.0));
/// assert!(result.success);
/// assert_eq!(result.coefficients, vec![2.0, 1.0, 2.0]);
/// println!("{}", result.details);
/// ```
pub mod engine;
