//! Text of the `details` field of a calculation result.
use super::equation_parser::ChemicalEquation;
use super::formula_parser::ChemicalFormula;
use super::masses::CompoundMass;
use prettytable::{Table, row};

/// integers without decimals, everything else with `precision` decimals
pub fn format_number(value: f64, precision: usize) -> String {
    if (value - value.round()).abs() < 1e-9 && value.abs() < 1e15 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.*}", precision, value)
    }
}

pub fn format_coefficients(coefficients: &[f64], precision: usize) -> String {
    let items: Vec<String> = coefficients.iter().map(|c| format_number(*c, precision)).collect();
    format!("[{}]", items.join(", "))
}

pub fn formula_report(formula: &ChemicalFormula, precision: usize) -> String {
    let composition: Vec<String> = formula
        .composition()
        .iter()
        .map(|(element, count)| format!("{}: {}", element, count))
        .collect();
    let mut table = Table::new();
    table.add_row(row!["Element", "Atoms", "Mass %", "Atomic %"]);
    for ((element, mass), (_, atomic)) in formula.mass_percent().iter().zip(formula.atomic_percent().iter()) {
        table.add_row(row![
            element,
            formula.count(element),
            format!("{:.*}", precision, mass),
            format!("{:.*}", precision, atomic)
        ]);
    }
    format!(
        "formula: {}\ncomposition: {}\nmolar mass: {:.*} g/mol\n{}",
        formula.format(),
        composition.join(", "),
        precision,
        formula.molar_mass(),
        table
    )
}

pub fn balance_report(
    equation: &ChemicalEquation,
    method: Option<&str>,
    coefficients: &[f64],
    precision: usize,
) -> String {
    let mut lines = Vec::new();
    if let Some(method) = method {
        lines.push(format!("method: {}", method));
    }
    lines.push(format!("coefficients: {}", format_coefficients(coefficients, precision)));
    lines.push(format!("final reaction: {}", equation.balanced_text(coefficients, precision)));
    lines.join("\n")
}

pub fn masses_report(masses: &[CompoundMass], precision: usize) -> String {
    let mut table = Table::new();
    table.add_row(row!["Compound", "Coefficient", "Molar mass, g/mol", "Mass, g"]);
    for m in masses {
        table.add_row(row![
            m.formula,
            format_number(m.coefficient, precision),
            format!("{:.*}", precision, m.molar_mass),
            format!("{:.*}", precision, m.mass)
        ]);
    }
    format!("required masses:\n{}", table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(2.0, 4), "2");
        assert_eq!(format_number(0.5, 2), "0.50");
        assert_eq!(format_coefficients(&[2.0, 1.0, 2.0], 4), "[2, 1, 2]");
        assert_eq!(format_coefficients(&[1.0, 0.5], 3), "[1, 0.500]");
    }

    #[test]
    fn test_formula_report() {
        let formula = ChemicalFormula::parse("H2SO4").unwrap();
        let details = formula_report(&formula, 3);
        assert!(details.contains("98.079"));
        assert!(details.contains("H: 2, S: 1, O: 4"));
        assert!(details.contains("Atomic %"));
    }

    #[test]
    fn test_balance_report() {
        let equation = ChemicalEquation::parse("H2+O2=H2O").unwrap();
        let details = balance_report(&equation, Some("inverse"), &[2.0, 1.0, 2.0], 4);
        assert_eq!(
            details,
            "method: inverse\ncoefficients: [2, 1, 2]\nfinal reaction: 2H2 + O2 -> 2H2O"
        );
    }
}
