use super::errors::StoichError;
use super::solvers::CoefficientVector;
use log::debug;

/// default largest multiplier tried by [`normalize`]
pub const DEFAULT_INTIFY_LIMIT: u32 = 500;
/// loosest integer-closeness accepted; a coarser tolerance would round every vector as it is
pub const MAX_INTIFY_TOLERANCE: f64 = 1e-3;

/// integer-closeness tolerance used for a request with the tolerance `epsilon`
pub fn intify_tolerance(epsilon: f64) -> f64 {
    epsilon.min(MAX_INTIFY_TOLERANCE)
}

/// rounding noise of a solver result relative to the entry; a finer tolerance is raised to it
const RELATIVE_NOISE: f64 = 1e-10;

fn is_integral(values: &[f64], tolerance: f64) -> bool {
    values
        .iter()
        .all(|v| (v - v.round()).abs() <= tolerance.max(RELATIVE_NOISE * v.abs().max(1.0)))
}

fn rounded(values: &[f64]) -> CoefficientVector {
    CoefficientVector::new(values.iter().map(|v| v.round()).collect())
}

/// "Intify": turns a real coefficient vector into the smallest positive integer vector
/// proportional to it.
///
/// The vector is sign-fixed first. With `enabled == false` that is all. A vector that is
/// already integral within `tolerance` is returned rounded and otherwise unchanged. Otherwise
/// the vector is divided by its smallest entry and multiplied by k = 1, 2, ..., `limit` until
/// every entry is within `tolerance` of an integer. The first such k gives the minimal integer
/// vector. Fails with NonIntegerConvergence when no k up to `limit` works.
pub fn normalize(
    vector: &CoefficientVector,
    tolerance: f64,
    enabled: bool,
    limit: u32,
) -> Result<CoefficientVector, StoichError> {
    let fixed = vector.sign_fixed();
    if !enabled {
        return Ok(fixed);
    }
    let values = fixed.as_slice();
    if is_integral(values, tolerance) {
        return Ok(rounded(values));
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    if !(min.is_finite() && min > 0.0) {
        return Err(StoichError::NoSolution(format!(
            "cannot scale {} to integers: entries must be positive",
            fixed
        )));
    }
    let base: Vec<f64> = values.iter().map(|v| v / min).collect();
    for k in 1..=limit {
        let scaled: Vec<f64> = base.iter().map(|v| v * k as f64).collect();
        if is_integral(&scaled, tolerance) {
            debug!("intify multiplier {} for {}", k, fixed);
            return Ok(rounded(&scaled));
        }
    }
    Err(StoichError::NonIntegerConvergence { limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intify(values: &[f64]) -> Result<Vec<f64>, StoichError> {
        normalize(&CoefficientVector::new(values.to_vec()), 1e-8, true, DEFAULT_INTIFY_LIMIT)
            .map(CoefficientVector::into_vec)
    }

    #[test]
    fn test_halves_and_thirds() {
        assert_eq!(intify(&[1.0, 0.5, 1.0]).unwrap(), vec![2.0, 1.0, 2.0]);
        assert_eq!(intify(&[1.0, 1.5, 1.0]).unwrap(), vec![2.0, 3.0, 2.0]);
        assert_eq!(intify(&[1.0 / 3.0, 0.5, 1.0]).unwrap(), vec![2.0, 3.0, 6.0]);
    }

    #[test]
    fn test_pseudo_inverse_output() {
        let scaled = intify(&[10.0 / 9.0, 5.0 / 9.0, 10.0 / 9.0]).unwrap();
        assert_eq!(scaled, vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_integers_are_left_alone() {
        assert_eq!(intify(&[4.0, 2.0, 4.0]).unwrap(), vec![4.0, 2.0, 4.0]);
        let once = intify(&[1.0, 0.5, 1.0]).unwrap();
        assert_eq!(intify(&once).unwrap(), once);
    }

    #[test]
    fn test_sign_fix_comes_first() {
        assert_eq!(intify(&[-1.0, -0.5, -1.0]).unwrap(), vec![2.0, 1.0, 2.0]);
        let v = normalize(&CoefficientVector::new(vec![-1.0, -0.5, -1.0]), 1e-8, false, 500).unwrap();
        assert_eq!(v.as_slice(), &[1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_coarse_tolerance_is_capped() {
        assert_eq!(intify_tolerance(1.0), MAX_INTIFY_TOLERANCE);
        assert_eq!(intify_tolerance(1e-8), 1e-8);
        // with the raw tolerance 1.0 every vector would count as integral
        let v = CoefficientVector::new(vec![10.0 / 9.0, 5.0 / 9.0, 10.0 / 9.0]);
        let scaled = normalize(&v, intify_tolerance(1.0), true, DEFAULT_INTIFY_LIMIT).unwrap();
        assert_eq!(scaled.as_slice(), &[2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_fine_tolerance_accepts_rounding_noise() {
        // partial pseudo-inverse output for KMnO4 + HCl at floatTolerance 16
        let noisy = CoefficientVector::new(vec![0.4, 3.2, 0.4, 0.40000000000000013, 1.6, 1.0]);
        for tolerance in [1e-12, 1e-14, 1e-16, 0.0] {
            let scaled = normalize(&noisy, tolerance, true, DEFAULT_INTIFY_LIMIT).unwrap();
            assert_eq!(scaled.as_slice(), &[2.0, 16.0, 2.0, 2.0, 8.0, 5.0]);
        }
        // large entries carry proportionally larger noise
        let large = CoefficientVector::new(vec![299.0 + 3e-11, 188.0, 5.0]);
        assert_eq!(
            normalize(&large, 1e-16, true, DEFAULT_INTIFY_LIMIT).unwrap().as_slice(),
            &[299.0, 188.0, 5.0]
        );
        // a real fraction is still no integer
        assert!(!is_integral(&[2.5], 1e-16));
        assert!(!is_integral(&[1000.001], 1e-16));
    }

    #[test]
    fn test_no_convergence() {
        let err = intify(&[1.0, std::f64::consts::SQRT_2]).unwrap_err();
        assert_eq!(err, StoichError::NonIntegerConvergence { limit: 500 });
        // 10:3 needs the multiplier 3
        let v = CoefficientVector::new(vec![1.0, 0.3]);
        assert_eq!(normalize(&v, 1e-8, true, 3).unwrap().as_slice(), &[10.0, 3.0]);
        let err = normalize(&v, 1e-8, true, 2).unwrap_err();
        assert_eq!(err, StoichError::NonIntegerConvergence { limit: 2 });
    }
}
