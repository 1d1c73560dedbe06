//! Exhaustive search over integer coefficient vectors with entries in `[1, max_bound]`.
//!
//! The first `n - 1` coefficients run through the Cartesian product `[1, max_bound]^(n-1)` in
//! ascending lexicographic order, like an odometer. For every prefix the last coefficient is the
//! only value that can zero one row of `M * c`, so it is computed instead of enumerated; the
//! first vector found is therefore also the lexicographically first solution of the full space.
//! The cancellation token is checked every `checkpoint_interval` candidates.
use super::{BalancingStrategy, CoefficientVector, SolveContext, accept_solution};
use crate::Stoichiometry::errors::StoichError;
use crate::Stoichiometry::stoich_matrix::StoichiometricMatrix;
use log::{debug, info};

#[derive(Debug, Clone, Copy)]
pub struct CombinatorialSolver {
    pub max_bound: u32,
}

impl CombinatorialSolver {
    pub fn new(max_bound: u32) -> Self {
        Self { max_bound }
    }
}

// last coefficient that makes every row vanish, if it exists and lies in [1, bound]
fn complete_candidate(residual: &[i128], last_column: &[i128], bound: i128) -> Option<i128> {
    let mut last: Option<i128> = None;
    for (r, m) in residual.iter().zip(last_column.iter()) {
        if *m == 0 {
            if *r != 0 {
                return None;
            }
            continue;
        }
        if r % m != 0 {
            return None;
        }
        let value = -r / m;
        match last {
            Some(v) if v != value => return None,
            _ => last = Some(value),
        }
    }
    last.filter(|v| *v >= 1 && *v <= bound)
}

impl BalancingStrategy for CombinatorialSolver {
    fn name(&self) -> &'static str {
        "combinatorial"
    }

    fn solve(&self, matrix: &StoichiometricMatrix, ctx: &SolveContext) -> Result<CoefficientVector, StoichError> {
        ctx.token.check()?;
        if self.max_bound == 0 {
            return Err(StoichError::NoSolution("combinatorial bound must be positive".to_string()));
        }
        let entries = matrix.integer_entries();
        let (rows, cols) = (matrix.nrows(), matrix.ncols());
        if cols < 2 {
            return Err(StoichError::NoSolution(format!("{}: too few compounds", self.name())));
        }
        let bound = self.max_bound as i128;
        let free = cols - 1;
        let column = |j: usize| -> Vec<i128> { (0..rows).map(|i| entries[i][j]).collect() };
        let columns: Vec<Vec<i128>> = (0..free).map(column).collect();
        let last_column = column(free);

        // odometer state, all digits start at 1
        let mut digits: Vec<i128> = vec![1; free];
        let mut residual: Vec<i128> = (0..rows)
            .map(|i| columns.iter().map(|col| col[i]).sum())
            .collect();
        let mut checked: u64 = 0;
        info!(
            "combinatorial search over [1, {}]^{} prefixes",
            self.max_bound, free
        );
        loop {
            if let Some(last) = complete_candidate(&residual, &last_column, bound) {
                let mut candidate: Vec<f64> = digits.iter().map(|d| *d as f64).collect();
                candidate.push(last as f64);
                debug!("combinatorial solution after {} candidates", checked + 1);
                return accept_solution(matrix, candidate, ctx.numeric_epsilon(), self.name());
            }
            checked += 1;
            if checked % ctx.checkpoint_interval == 0 {
                ctx.token.check()?;
            }
            // advance: the last free digit runs fastest
            let mut position = free;
            loop {
                if position == 0 {
                    return Err(StoichError::NoSolution(format!(
                        "no integer coefficients within [1, {}] after {} candidates",
                        self.max_bound, checked
                    )));
                }
                position -= 1;
                if digits[position] < bound {
                    digits[position] += 1;
                    for (r, m) in residual.iter_mut().zip(columns[position].iter()) {
                        *r += m;
                    }
                    break;
                }
                // wrap this digit back to 1
                for (r, m) in residual.iter_mut().zip(columns[position].iter()) {
                    *r -= (bound - 1) * m;
                }
                digits[position] = 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Stoichiometry::cancellation::CancellationToken;
    use crate::Stoichiometry::equation_parser::ChemicalEquation;

    fn matrix_of(equation: &str) -> StoichiometricMatrix {
        StoichiometricMatrix::build(&ChemicalEquation::parse(equation).unwrap())
    }

    fn ctx() -> SolveContext {
        SolveContext::new(1e-8, CancellationToken::new())
    }

    #[test]
    fn test_finds_integer_coefficients() {
        let c = CombinatorialSolver::new(15).solve(&matrix_of("H2+O2=H2O"), &ctx()).unwrap();
        assert_eq!(c.as_slice(), &[2.0, 1.0, 2.0]);
        let c = CombinatorialSolver::new(15).solve(&matrix_of("Fe+O2=Fe2O3"), &ctx()).unwrap();
        assert_eq!(c.as_slice(), &[4.0, 3.0, 2.0]);
        let c = CombinatorialSolver::new(15)
            .solve(&matrix_of("C3H8+O2=CO2+H2O"), &ctx())
            .unwrap();
        assert_eq!(c.as_slice(), &[1.0, 5.0, 3.0, 4.0]);
    }

    #[test]
    fn test_bound_exhausted() {
        let err = CombinatorialSolver::new(3)
            .solve(&matrix_of("Fe+O2=Fe2O3"), &ctx())
            .unwrap_err();
        assert!(matches!(err, StoichError::NoSolution(_)));
    }

    #[test]
    fn test_bound_is_inclusive() {
        let c = CombinatorialSolver::new(4).solve(&matrix_of("Fe+O2=Fe2O3"), &ctx()).unwrap();
        assert_eq!(c.as_slice(), &[4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_lexicographic_first_vector() {
        // every multiple of (1,1,1,1) balances; the first one in search order is returned
        let c = CombinatorialSolver::new(5)
            .solve(&matrix_of("NaOH+HCl=NaCl+H2O"), &ctx())
            .unwrap();
        assert_eq!(c.as_slice(), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_cancellation_inside_the_search() {
        // no positive solution exists, so only the token can stop a search this large
        let m = matrix_of("H2O2+H2O2=H2O+H2O");
        let context = ctx().with_checkpoint_interval(64);
        let token = context.token.clone();
        let handle = std::thread::spawn(move || CombinatorialSolver::new(100_000).solve(&m, &context));
        std::thread::sleep(std::time::Duration::from_millis(20));
        token.cancel();
        assert_eq!(handle.join().unwrap(), Err(StoichError::Cancelled));
    }

    #[test]
    fn test_complete_candidate() {
        assert_eq!(complete_candidate(&[2, 1], &[-1, -1], 5), None);
        assert_eq!(complete_candidate(&[2, 2], &[-1, -1], 5), Some(2));
        assert_eq!(complete_candidate(&[0, 2], &[0, -2], 5), Some(1));
        assert_eq!(complete_candidate(&[1, 0], &[0, -2], 5), None);
        assert_eq!(complete_candidate(&[12, 12], &[-1, -1], 5), None);
    }
}
