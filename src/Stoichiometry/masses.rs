use super::equation_parser::ChemicalEquation;
use super::errors::StoichError;
use log::info;
use serde::Serialize;

/// required mass of one compound of the reaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompoundMass {
    pub formula: String,
    pub coefficient: f64,
    pub molar_mass: f64,
    pub mass: f64,
}

/// checks the Masses-mode parameters against the equation before anything is computed
pub fn validate_target(equation: &ChemicalEquation, target_index: usize, target_mass: f64) -> Result<(), StoichError> {
    let compound = equation.compound(target_index).ok_or_else(|| {
        StoichError::InvalidTarget(format!(
            "index {} is out of range, the equation has {} compounds",
            target_index,
            equation.compound_count()
        ))
    })?;
    if !(compound.molar_mass() > 0.0) {
        return Err(StoichError::InvalidTarget(format!(
            "{} has no positive molar mass",
            compound.text()
        )));
    }
    if !(target_mass.is_finite() && target_mass > 0.0) {
        return Err(StoichError::InvalidMass(target_mass));
    }
    Ok(())
}

/// Masses of every compound needed to get (or consume) `target_mass` grams of the compound at
/// `target_index`:
///
/// m_i = target_mass * (c_i * M_i) / (c_target * M_target)
pub fn compute_masses(
    equation: &ChemicalEquation,
    coefficients: &[f64],
    target_index: usize,
    target_mass: f64,
) -> Result<Vec<CompoundMass>, StoichError> {
    validate_target(equation, target_index, target_mass)?;
    if coefficients.len() != equation.compound_count() {
        return Err(StoichError::InvalidRequest(format!(
            "{} coefficients for {} compounds",
            coefficients.len(),
            equation.compound_count()
        )));
    }
    let molar_masses = equation.molar_masses();
    let reference = coefficients[target_index] * molar_masses[target_index];
    if !(reference.is_finite() && reference > 0.0) {
        return Err(StoichError::InvalidTarget(format!(
            "coefficient of the target compound is {}",
            coefficients[target_index]
        )));
    }
    let masses: Vec<CompoundMass> = equation
        .compounds()
        .zip(coefficients.iter().zip(molar_masses.iter()))
        .map(|(formula, (c, m))| CompoundMass {
            formula: formula.text().to_string(),
            coefficient: *c,
            molar_mass: *m,
            mass: target_mass * c * m / reference,
        })
        .collect();
    info!(
        "masses scaled to {} g of {}",
        target_mass,
        masses[target_index].formula
    );
    Ok(masses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_water_from_hydrogen() {
        let equation = ChemicalEquation::parse("H2+O2=H2O").unwrap();
        let masses = compute_masses(&equation, &[2.0, 1.0, 2.0], 2, 18.0).unwrap();
        assert_eq!(masses.len(), 3);
        assert_relative_eq!(masses[0].mass, 2.0, epsilon = 0.05);
        assert_relative_eq!(masses[1].mass, 16.0, epsilon = 0.05);
        assert_relative_eq!(masses[2].mass, 18.0, epsilon = 1e-12);
        // mass is conserved
        assert_relative_eq!(masses[0].mass + masses[1].mass, masses[2].mass, epsilon = 1e-9);
    }

    #[test]
    fn test_bad_target() {
        let equation = ChemicalEquation::parse("H2+O2=H2O").unwrap();
        assert!(matches!(
            compute_masses(&equation, &[2.0, 1.0, 2.0], 3, 1.0),
            Err(StoichError::InvalidTarget(_))
        ));
        assert_eq!(
            compute_masses(&equation, &[2.0, 1.0, 2.0], 0, 0.0),
            Err(StoichError::InvalidMass(0.0))
        );
        assert!(matches!(
            compute_masses(&equation, &[2.0, 1.0, 2.0], 0, -1.0),
            Err(StoichError::InvalidMass(_))
        ));
        assert!(matches!(
            compute_masses(&equation, &[0.0, 1.0, 2.0], 0, 1.0),
            Err(StoichError::InvalidTarget(_))
        ));
        assert!(matches!(
            compute_masses(&equation, &[2.0, 1.0], 0, 1.0),
            Err(StoichError::InvalidRequest(_))
        ));
    }
}
