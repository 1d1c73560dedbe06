//! Moore-Penrose pseudo-inverse methods.
//!
//! Generalized: `c = (I - M⁺ M) y` with `y = (1, ..., 1)` projects a vector onto the null
//! space of the whole matrix, works for any shape.
//! Partial: the last column `b` is moved to the right-hand side with its coefficient fixed to 1,
//! the rest `A x = -b` is solved as `x = -A⁺ b` and the 1 is appended back.
use super::{BalancingStrategy, CoefficientVector, SolveContext, accept_solution};
use crate::Stoichiometry::errors::StoichError;
use crate::Stoichiometry::stoich_matrix::StoichiometricMatrix;
use log::debug;
use nalgebra::{DMatrix, DVector};

fn pseudo_inverse(matrix: DMatrix<f64>, epsilon: f64) -> Result<DMatrix<f64>, StoichError> {
    matrix
        .pseudo_inverse(epsilon)
        .map_err(|e| StoichError::NoSolution(format!("pseudo-inverse failed: {}", e)))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneralizedPseudoInverseSolver;

impl BalancingStrategy for GeneralizedPseudoInverseSolver {
    fn name(&self) -> &'static str {
        "generalized pseudo-inverse"
    }

    fn solve(&self, matrix: &StoichiometricMatrix, ctx: &SolveContext) -> Result<CoefficientVector, StoichError> {
        ctx.token.check()?;
        let n = matrix.ncols();
        let pinv = pseudo_inverse(matrix.matrix.clone(), ctx.numeric_epsilon())?;
        let projector = DMatrix::<f64>::identity(n, n) - pinv * &matrix.matrix;
        let solution = projector * DVector::from_element(n, 1.0);
        debug!("generalized pseudo-inverse raw solution {:?}", solution.as_slice());
        if solution.amax() <= ctx.numeric_epsilon() {
            return Err(StoichError::NoSolution(format!(
                "{}: null space is empty",
                self.name()
            )));
        }
        accept_solution(matrix, solution.as_slice().to_vec(), ctx.numeric_epsilon(), self.name())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PartialPseudoInverseSolver;

impl BalancingStrategy for PartialPseudoInverseSolver {
    fn name(&self) -> &'static str {
        "partial pseudo-inverse"
    }

    fn solve(&self, matrix: &StoichiometricMatrix, ctx: &SolveContext) -> Result<CoefficientVector, StoichError> {
        ctx.token.check()?;
        let n = matrix.ncols();
        if n < 2 {
            return Err(StoichError::NoSolution(format!("{}: too few compounds", self.name())));
        }
        let reduced = matrix.matrix.columns(0, n - 1).into_owned();
        let fixed = matrix.matrix.column(n - 1).into_owned();
        let pinv = pseudo_inverse(reduced, ctx.numeric_epsilon())?;
        let partial = -(pinv * fixed);
        let mut solution: Vec<f64> = partial.as_slice().to_vec();
        solution.push(1.0);
        debug!("partial pseudo-inverse raw solution {:?}", solution);
        accept_solution(matrix, solution, ctx.numeric_epsilon(), self.name())
    }
}
