use super::{BalancingStrategy, CoefficientVector, SolveContext, accept_solution};
use crate::Stoichiometry::errors::StoichError;
use crate::Stoichiometry::stoich_matrix::StoichiometricMatrix;
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Direct inversion. The matrix gets an extra row fixing the last coefficient to 1, the
/// system `[M; e_n] c = e_n` is solved with the inverse. Applicable only when this augmented
/// matrix is square and non-singular, i.e. when there are exactly `compounds - 1` elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseSolver;

impl BalancingStrategy for InverseSolver {
    fn name(&self) -> &'static str {
        "inverse"
    }

    fn solve(&self, matrix: &StoichiometricMatrix, ctx: &SolveContext) -> Result<CoefficientVector, StoichError> {
        ctx.token.check()?;
        let (rows, cols) = (matrix.nrows(), matrix.ncols());
        if rows + 1 != cols {
            return Err(StoichError::SingularMatrix(format!(
                "augmented matrix is {}x{}, not square",
                rows + 1,
                cols
            )));
        }
        let mut augmented = DMatrix::<f64>::zeros(cols, cols);
        augmented.view_mut((0, 0), (rows, cols)).copy_from(&matrix.matrix);
        augmented[(rows, cols - 1)] = 1.0;

        let det = augmented.determinant();
        if det.abs() < ctx.numeric_epsilon() {
            return Err(StoichError::SingularMatrix(format!("determinant = {:.3e}", det)));
        }
        let inverse = augmented
            .try_inverse()
            .ok_or_else(|| StoichError::SingularMatrix("matrix is not invertible".to_string()))?;
        let mut rhs = DVector::<f64>::zeros(cols);
        rhs[cols - 1] = 1.0;
        let solution = inverse * rhs;
        debug!("inverse method raw solution {:?}", solution.as_slice());
        accept_solution(matrix, solution.as_slice().to_vec(), ctx.numeric_epsilon(), self.name())
    }
}
