use super::equation_parser::ChemicalEquation;
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Element composition matrix of a reaction: rows are elements (first-seen order), columns are
/// compounds (reactants then products), entries are atom counts with product columns negated.
/// A coefficient vector balances the reaction iff it lies in the null space of this matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct StoichiometricMatrix {
    pub elements: Vec<String>,
    pub matrix: DMatrix<f64>,
    pub reactant_count: usize,
}

impl StoichiometricMatrix {
    /// builds the matrix of a parsed equation; total for any valid equation
    pub fn build(equation: &ChemicalEquation) -> Self {
        let elements = equation.elements().to_vec();
        let num_rows = elements.len();
        let num_cols = equation.compound_count();
        let reactant_count = equation.reactants().len();
        let mut matrix = DMatrix::<f64>::zeros(num_rows, num_cols);
        for (j, formula) in equation.compounds().enumerate() {
            let sign = if j < reactant_count { 1.0 } else { -1.0 };
            for (i, element) in elements.iter().enumerate() {
                matrix[(i, j)] = sign * formula.count(element) as f64;
            }
        }
        debug!("stoichiometric matrix {}x{} for elements {:?}", num_rows, num_cols, elements);
        Self {
            elements,
            matrix,
            reactant_count,
        }
    }

    pub fn from_matrix(elements: Vec<String>, matrix: DMatrix<f64>, reactant_count: usize) -> Self {
        Self {
            elements,
            matrix,
            reactant_count,
        }
    }

    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }
    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }
    pub fn rank(&self, epsilon: f64) -> usize {
        self.matrix.rank(epsilon)
    }

    /// M * c
    pub fn residual(&self, coefficients: &[f64]) -> DVector<f64> {
        let c = DVector::from_column_slice(coefficients);
        &self.matrix * c
    }

    /// smallest relative residual f64 arithmetic can promise for this matrix
    pub fn rounding_floor(&self) -> f64 {
        64.0 * f64::EPSILON * self.ncols() as f64 * self.matrix.amax().max(1.0)
    }

    /// true when |M * c| is within epsilon, scaled by the magnitude of the coefficients; an
    /// epsilon below [`rounding_floor`](Self::rounding_floor) is raised to it
    pub fn is_balanced_by(&self, coefficients: &[f64], epsilon: f64) -> bool {
        if coefficients.len() != self.ncols() {
            return false;
        }
        let scale = coefficients.iter().fold(1.0_f64, |acc, c| acc.max(c.abs()));
        self.residual(coefficients).amax() <= epsilon.max(self.rounding_floor()) * scale
    }

    /// the matrix with exact integer entries, for the combinatorial search; i128 holds any
    /// atom count a formula can carry
    pub fn integer_entries(&self) -> Vec<Vec<i128>> {
        (0..self.nrows())
            .map(|i| (0..self.ncols()).map(|j| self.matrix[(i, j)].round() as i128).collect())
            .collect()
    }
}
