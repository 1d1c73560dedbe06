//! Strategies that find stoichiometric coefficients: a vector `c` with `M * c = 0`, `c != 0`
//! and all entries positive after the sign fix.
//!
//! Every strategy implements [`BalancingStrategy`]; [`Strategy`] dispatches over them and
//! [`BalancingMethod`] is the caller-facing choice, including the `Auto` policy that tries
//! Inverse, GeneralizedPseudoInverse, PartialPseudoInverse and Combinatorial in that order.
pub mod combinatorial;
pub mod inverse;
pub mod pseudo_inverse;

use super::cancellation::CancellationToken;
use super::errors::StoichError;
use super::stoich_matrix::StoichiometricMatrix;
use combinatorial::CombinatorialSolver;
use enum_dispatch::enum_dispatch;
use inverse::InverseSolver;
use log::info;
use pseudo_inverse::{GeneralizedPseudoInverseSolver, PartialPseudoInverseSolver};
use std::fmt;

/// default upper bound of the combinatorial search
pub const DEFAULT_COMBINATORIAL_BOUND: u32 = 15;
/// number of candidate vectors between two cancellation checks
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 1 << 14;
/// loosest threshold used for determinants, singular values and the balance check of a result
pub const MAX_NUMERIC_EPSILON: f64 = 1e-9;
/// tightest one; smaller singular values of a stoichiometric matrix are rounding noise
pub const MIN_NUMERIC_EPSILON: f64 = 1e-12;
/// entries below this fraction of the largest one are numerical zeros
const POSITIVITY_FLOOR: f64 = 1e-12;

/// tolerance 10^(-float_tolerance)
pub fn tolerance_epsilon(float_tolerance: u32) -> f64 {
    10f64.powi(-(float_tolerance.min(300) as i32))
}

/// Real-valued coefficients, one per compound in matrix column order. Never mutated: every
/// transformation returns a new vector.
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientVector {
    values: Vec<f64>,
}

impl CoefficientVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    /// multiplies by -1 when most entries are negative
    pub fn sign_fixed(&self) -> Self {
        let negative = self.values.iter().filter(|c| **c < 0.0).count();
        if 2 * negative > self.values.len() {
            Self::new(self.values.iter().map(|c| -c).collect())
        } else {
            self.clone()
        }
    }
    /// every entry strictly greater than epsilon
    pub fn is_positive(&self, epsilon: f64) -> bool {
        !self.values.is_empty() && self.values.iter().all(|c| c.is_finite() && *c > epsilon)
    }
}

impl fmt::Display for CoefficientVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.values.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", items.join(", "))
    }
}

/// what every strategy gets besides the matrix
#[derive(Debug, Clone)]
pub struct SolveContext {
    pub epsilon: f64,
    pub token: CancellationToken,
    pub checkpoint_interval: u64,
}

impl SolveContext {
    pub fn new(epsilon: f64, token: CancellationToken) -> Self {
        Self {
            epsilon,
            token,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }
    /// the caller tolerance clamped to `[MIN_NUMERIC_EPSILON, MAX_NUMERIC_EPSILON]`: a coarse
    /// `floatTolerance` must not hide rank or residual, a fine one must not ask for more than f64 holds
    pub fn numeric_epsilon(&self) -> f64 {
        self.epsilon.clamp(MIN_NUMERIC_EPSILON, MAX_NUMERIC_EPSILON)
    }
}

/// sign-fixes a raw solution and accepts it only if it balances the matrix with positive entries
pub fn accept_solution(
    matrix: &StoichiometricMatrix,
    raw: Vec<f64>,
    epsilon: f64,
    method: &str,
) -> Result<CoefficientVector, StoichError> {
    let vector = CoefficientVector::new(raw).sign_fixed();
    if vector.len() != matrix.ncols() || vector.as_slice().iter().any(|c| !c.is_finite()) {
        return Err(StoichError::NoSolution(format!("{} produced no usable vector", method)));
    }
    let magnitude = vector.as_slice().iter().fold(0.0_f64, |acc, c| acc.max(c.abs()));
    if magnitude <= f64::MIN_POSITIVE {
        return Err(StoichError::NoSolution(format!("{}: null space is empty", method)));
    }
    if !matrix.is_balanced_by(vector.as_slice(), epsilon) {
        return Err(StoichError::NoSolution(format!("{}: result does not balance the equation", method)));
    }
    if !vector.is_positive(POSITIVITY_FLOOR * magnitude) {
        return Err(StoichError::NoSolution(format!(
            "{}: result {} has non-positive coefficients",
            method, vector
        )));
    }
    Ok(vector)
}

#[enum_dispatch]
pub trait BalancingStrategy {
    fn name(&self) -> &'static str;
    fn solve(&self, matrix: &StoichiometricMatrix, ctx: &SolveContext) -> Result<CoefficientVector, StoichError>;
}

#[derive(Debug, Clone)]
#[enum_dispatch(BalancingStrategy)]
pub enum Strategy {
    Inverse(InverseSolver),
    GeneralizedPseudoInverse(GeneralizedPseudoInverseSolver),
    PartialPseudoInverse(PartialPseudoInverseSolver),
    Combinatorial(CombinatorialSolver),
}

/// caller-facing choice of the solving method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancingMethod {
    Inverse,
    GeneralizedPseudoInverse,
    PartialPseudoInverse,
    Combinatorial(u32),
    /// not a numeric method: tries the others in a fixed order; carries the combinatorial bound
    Auto(u32),
}

impl BalancingMethod {
    pub fn name(&self) -> &'static str {
        match self {
            BalancingMethod::Inverse => "inverse",
            BalancingMethod::GeneralizedPseudoInverse => "generalized pseudo-inverse",
            BalancingMethod::PartialPseudoInverse => "partial pseudo-inverse",
            BalancingMethod::Combinatorial(_) => "combinatorial",
            BalancingMethod::Auto(_) => "auto",
        }
    }

    /// strategies in the order they are tried
    pub fn strategies(&self) -> Vec<Strategy> {
        match *self {
            BalancingMethod::Inverse => vec![InverseSolver.into()],
            BalancingMethod::GeneralizedPseudoInverse => vec![GeneralizedPseudoInverseSolver.into()],
            BalancingMethod::PartialPseudoInverse => vec![PartialPseudoInverseSolver.into()],
            BalancingMethod::Combinatorial(bound) => vec![CombinatorialSolver::new(bound).into()],
            BalancingMethod::Auto(bound) => {
                let mut strategies: Vec<Strategy> = vec![
                    InverseSolver.into(),
                    GeneralizedPseudoInverseSolver.into(),
                    PartialPseudoInverseSolver.into(),
                ];
                // bound 0 leaves no combinatorial fallback
                if bound > 0 {
                    strategies.push(CombinatorialSolver::new(bound).into());
                }
                strategies
            }
        }
    }
}

/// coefficients and the name of the strategy that produced them
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub coefficients: CoefficientVector,
    pub method: &'static str,
}

/// Runs the strategies of `method` in order and accepts the first success. Only
/// SingularMatrix/NoSolution fall through to the next strategy; the last failure is returned
/// when all of them fail. Cancellation is checked before every strategy.
pub fn balance(
    matrix: &StoichiometricMatrix,
    method: BalancingMethod,
    ctx: &SolveContext,
) -> Result<Solution, StoichError> {
    let mut last_error = StoichError::NoSolution(format!("{} has no strategies", method.name()));
    for strategy in method.strategies() {
        ctx.token.check()?;
        match strategy.solve(matrix, ctx) {
            Ok(coefficients) => {
                info!("coefficients found by {} method: {}", strategy.name(), coefficients);
                return Ok(Solution {
                    coefficients,
                    method: strategy.name(),
                });
            }
            Err(e) if e.is_strategy_failure() => {
                info!("{} method failed: {}", strategy.name(), e);
                last_error = e;
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stoichiometry::equation_parser::ChemicalEquation;
    use approx::assert_relative_eq;

    fn matrix_of(equation: &str) -> StoichiometricMatrix {
        StoichiometricMatrix::build(&ChemicalEquation::parse(equation).unwrap())
    }

    fn ctx() -> SolveContext {
        SolveContext::new(tolerance_epsilon(8), CancellationToken::new())
    }

    #[test]
    fn test_tolerance_epsilon() {
        assert_eq!(tolerance_epsilon(0), 1.0);
        assert_relative_eq!(tolerance_epsilon(3), 1e-3, epsilon = 1e-15);
        assert_relative_eq!(tolerance_epsilon(8), 1e-8, epsilon = 1e-20);
    }

    #[test]
    fn test_sign_fix_by_majority() {
        let v = CoefficientVector::new(vec![-2.0, -1.0, 2.0]).sign_fixed();
        assert_eq!(v.as_slice(), &[2.0, 1.0, -2.0]);
        let v = CoefficientVector::new(vec![2.0, -1.0, 2.0]).sign_fixed();
        assert_eq!(v.as_slice(), &[2.0, -1.0, 2.0]);
        assert!(!v.is_positive(1e-8));
    }

    #[test]
    fn test_auto_prefers_inverse() {
        let solution = balance(&matrix_of("H2+O2=H2O"), BalancingMethod::Auto(15), &ctx()).unwrap();
        assert_eq!(solution.method, "inverse");
    }

    #[test]
    fn test_auto_falls_through_to_pseudo_inverse() {
        // 4 elements and 4 compounds: the augmented matrix is not square
        let m = matrix_of("NaOH + HCl = NaCl + H2O");
        assert!(InverseSolver.solve(&m, &ctx()).is_err());
        let solution = balance(&m, BalancingMethod::Auto(15), &ctx()).unwrap();
        assert_eq!(solution.method, "generalized pseudo-inverse");
        assert!(m.is_balanced_by(solution.coefficients.as_slice(), 1e-8));
    }

    #[test]
    fn test_explicit_method_failure_is_surfaced() {
        let m = matrix_of("NaOH + HCl = NaCl + H2O");
        let err = balance(&m, BalancingMethod::Inverse, &ctx()).unwrap_err();
        assert!(matches!(err, StoichError::SingularMatrix(_)));
    }

    #[test]
    fn test_auto_without_combinatorial_bound() {
        assert_eq!(BalancingMethod::Auto(0).strategies().len(), 3);
        assert_eq!(BalancingMethod::Auto(15).strategies().len(), 4);
        let solution = balance(&matrix_of("Fe+Cl2=FeCl3"), BalancingMethod::Auto(0), &ctx()).unwrap();
        assert_eq!(solution.method, "inverse");
        let err = balance(&matrix_of("H2O2=H2O"), BalancingMethod::Auto(0), &ctx()).unwrap_err();
        assert!(matches!(err, StoichError::NoSolution(_)));
    }

    #[test]
    fn test_cancelled_before_start() {
        let context = ctx();
        context.token.cancel();
        let err = balance(&matrix_of("H2+O2=H2O"), BalancingMethod::Auto(15), &context).unwrap_err();
        assert_eq!(err, StoichError::Cancelled);
    }

    #[test]
    fn test_acceptance_does_not_depend_on_float_tolerance() {
        let m = matrix_of("H2+O2=H2O");
        for epsilon in [1.0, 0.1, 0.01] {
            let v = accept_solution(&m, vec![2.0, 1.0, 2.0], epsilon, "test").unwrap();
            assert_eq!(v.as_slice(), &[2.0, 1.0, 2.0]);
        }
        // small but genuine coefficient next to a large one
        let m = matrix_of("K4Fe(CN)6 + KMnO4 + H2SO4 = KHSO4 + Fe2(SO4)3 + MnSO4 + HNO3 + CO2 + H2O");
        let exact = vec![10.0, 122.0, 299.0, 162.0, 5.0, 122.0, 60.0, 60.0, 188.0];
        assert!(accept_solution(&m, exact, 0.1, "test").is_ok());
        assert!(accept_solution(&m, vec![0.0; 9], 1.0, "test").is_err());
    }

    #[test]
    fn test_coarse_tolerance_keeps_linear_algebra_tight() {
        let coarse = SolveContext::new(tolerance_epsilon(0), CancellationToken::new());
        assert_eq!(coarse.numeric_epsilon(), MAX_NUMERIC_EPSILON);
        assert_eq!(ctx().numeric_epsilon(), 1e-9);
        for float_tolerance in [12, 16, 300] {
            let fine = SolveContext::new(tolerance_epsilon(float_tolerance), CancellationToken::new());
            assert_eq!(fine.numeric_epsilon(), MIN_NUMERIC_EPSILON);
        }
        for method in [
            BalancingMethod::Auto(15),
            BalancingMethod::GeneralizedPseudoInverse,
            BalancingMethod::PartialPseudoInverse,
            BalancingMethod::Combinatorial(15),
        ] {
            let solution = balance(&matrix_of("Fe+Cl2=FeCl3"), method, &coarse).unwrap();
            assert!(solution.coefficients.is_positive(0.0), "{}", method.name());
        }
    }

    #[test]
    fn test_auto_equivalence_on_inverse_solvable_equations() {
        for equation in ["H2+O2=H2O", "Fe+Cl2=FeCl3", "CH4+O2=CO2+H2O", "KMnO4+HCl=KCl+MnCl2+H2O+Cl2"] {
            let m = matrix_of(equation);
            let direct = InverseSolver.solve(&m, &ctx()).unwrap();
            let auto = balance(&m, BalancingMethod::Auto(15), &ctx()).unwrap();
            assert!(m.is_balanced_by(direct.as_slice(), 1e-8), "{}", equation);
            assert!(m.is_balanced_by(auto.coefficients.as_slice(), 1e-8), "{}", equation);
            assert!(auto.coefficients.is_positive(0.0));
        }
    }
}
