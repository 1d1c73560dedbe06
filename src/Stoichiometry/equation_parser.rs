//! Splitting of reaction equations like `2H2 + O2 = 2H2O` into reactants and products.
use super::errors::{ParseError, StoichError};
use super::formula_parser::ChemicalFormula;
use regex::Regex;
use std::sync::LazyLock;

// longer separators first, so that "==" or "-->" are found as a single separator
static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<=>|<->|-->|==|->|=|→|⟶|⇄|⇌").expect("separator pattern is valid")
});

/// Reaction equation: ordered reactants and products, the coefficients written in front of the
/// formulas (1 where absent) and the distinct elements in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct ChemicalEquation {
    text: String,
    separator: String,
    reactants: Vec<ChemicalFormula>,
    products: Vec<ChemicalFormula>,
    initial_coefficients: Vec<f64>,
    elements: Vec<String>,
}

// "0.5O2" -> (0.5, "O2"), "H2" -> (1.0, "H2")
fn split_coefficient(fragment: &str) -> Result<(f64, &str), ParseError> {
    let end = fragment
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(fragment.len());
    let (number, formula) = fragment.split_at(end);
    if number.is_empty() {
        return Ok((1.0, formula.trim()));
    }
    match number.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok((value, formula.trim())),
        _ => Err(ParseError::InvalidCoefficient(number.to_string())),
    }
}

fn parse_side(side: &str, side_name: &str, equation: &str) -> Result<Vec<(f64, ChemicalFormula)>, ParseError> {
    let mut compounds = Vec::new();
    for fragment in side.split('+').map(str::trim).filter(|s| !s.is_empty()) {
        let wrap = |source: ParseError| ParseError::InFormula {
            fragment: fragment.to_string(),
            source: Box::new(source),
        };
        let (coefficient, formula) = split_coefficient(fragment).map_err(wrap)?;
        let formula = ChemicalFormula::parse(formula).map_err(wrap)?;
        compounds.push((coefficient, formula));
    }
    if compounds.is_empty() {
        return Err(ParseError::EmptySide {
            side: side_name.to_string(),
            equation: equation.to_string(),
        });
    }
    Ok(compounds)
}

fn collect_elements<'a>(formulas: impl Iterator<Item = &'a ChemicalFormula>) -> Vec<String> {
    let mut elements: Vec<String> = Vec::new();
    for formula in formulas {
        for element in formula.elements() {
            if !elements.iter().any(|e| e == element) {
                elements.push(element.to_string());
            }
        }
    }
    elements
}

impl ChemicalEquation {
    /// Parses an equation. Fails with a ParseError when the separator is missing or repeated,
    /// a side is empty or a formula is malformed (the offending substring is attached), and
    /// with Unbalanceable when the sides are built from different elements.
    pub fn parse(text: &str) -> Result<Self, StoichError> {
        let separators: Vec<_> = SEPARATOR.find_iter(text).collect();
        let separator = match separators.as_slice() {
            [] => return Err(ParseError::MissingSeparator(text.to_string()).into()),
            [single] => *single,
            _ => return Err(ParseError::MultipleSeparators(text.to_string()).into()),
        };
        let left = &text[..separator.start()];
        let right = &text[separator.end()..];
        let reactants = parse_side(left, "reactant", text)?;
        let products = parse_side(right, "product", text)?;

        let reactant_elements = collect_elements(reactants.iter().map(|(_, f)| f));
        let product_elements = collect_elements(products.iter().map(|(_, f)| f));
        let only_left: Vec<&str> = reactant_elements
            .iter()
            .filter(|e| !product_elements.contains(e))
            .map(String::as_str)
            .collect();
        let only_right: Vec<&str> = product_elements
            .iter()
            .filter(|e| !reactant_elements.contains(e))
            .map(String::as_str)
            .collect();
        if !only_left.is_empty() || !only_right.is_empty() {
            let mut reasons = Vec::new();
            if !only_left.is_empty() {
                reasons.push(format!("{} only among reactants", only_left.join(", ")));
            }
            if !only_right.is_empty() {
                reasons.push(format!("{} only among products", only_right.join(", ")));
            }
            return Err(StoichError::Unbalanceable(reasons.join("; ")));
        }

        let initial_coefficients = reactants.iter().chain(products.iter()).map(|(c, _)| *c).collect();
        let elements = collect_elements(reactants.iter().chain(products.iter()).map(|(_, f)| f));
        Ok(Self {
            text: text.to_string(),
            separator: separator.as_str().to_string(),
            reactants: reactants.into_iter().map(|(_, f)| f).collect(),
            products: products.into_iter().map(|(_, f)| f).collect(),
            initial_coefficients,
            elements,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn separator(&self) -> &str {
        &self.separator
    }
    pub fn reactants(&self) -> &[ChemicalFormula] {
        &self.reactants
    }
    pub fn products(&self) -> &[ChemicalFormula] {
        &self.products
    }
    /// reactants then products, the column order of the stoichiometric matrix
    pub fn compounds(&self) -> impl Iterator<Item = &ChemicalFormula> {
        self.reactants.iter().chain(self.products.iter())
    }
    pub fn compound(&self, index: usize) -> Option<&ChemicalFormula> {
        self.compounds().nth(index)
    }
    pub fn compound_count(&self) -> usize {
        self.reactants.len() + self.products.len()
    }
    /// coefficients written in the equation text, 1 where absent
    pub fn initial_coefficients(&self) -> &[f64] {
        &self.initial_coefficients
    }
    /// distinct elements, first-seen order
    pub fn elements(&self) -> &[String] {
        &self.elements
    }
    pub fn molar_masses(&self) -> Vec<f64> {
        self.compounds().map(|f| f.molar_mass()).collect()
    }

    /// equation text with the given coefficients: `2H2 + O2 -> 2H2O`
    pub fn balanced_text(&self, coefficients: &[f64], precision: usize) -> String {
        let term = |(coefficient, formula): (&f64, &ChemicalFormula)| {
            let rounded = coefficient.round();
            if (coefficient - rounded).abs() < 1e-9 {
                if rounded == 1.0 {
                    formula.text().to_string()
                } else {
                    format!("{}{}", rounded, formula.text())
                }
            } else {
                format!("{:.*}{}", precision, coefficient, formula.text())
            }
        };
        let (left, right) = coefficients.split_at(self.reactants.len().min(coefficients.len()));
        let left: Vec<String> = left.iter().zip(self.reactants.iter()).map(term).collect();
        let right: Vec<String> = right.iter().zip(self.products.iter()).map(term).collect();
        format!("{} -> {}", left.join(" + "), right.join(" + "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_equation() {
        let equation = ChemicalEquation::parse("H2 + O2 = H2O").unwrap();
        assert_eq!(equation.reactants().len(), 2);
        assert_eq!(equation.products().len(), 1);
        assert_eq!(equation.products()[0].text(), "H2O");
        assert_eq!(equation.elements(), &["H".to_string(), "O".to_string()]);
        assert_eq!(equation.initial_coefficients(), &[1.0, 1.0, 1.0]);
        assert_eq!(equation.separator(), "=");
        assert_eq!(equation.compound_count(), 3);
    }

    #[test]
    fn test_arrows_and_supplied_coefficients() {
        for text in ["2H2+O2->2H2O", "2H2+O2→2H2O", "2H2+O2<=>2H2O", "2H2+O2==2H2O"] {
            let equation = ChemicalEquation::parse(text).unwrap();
            assert_eq!(equation.initial_coefficients(), &[2.0, 1.0, 2.0], "{}", text);
        }
        let equation = ChemicalEquation::parse("H2 + 0.5O2 = H2O").unwrap();
        assert_eq!(equation.initial_coefficients(), &[1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_empty_pieces_are_discarded() {
        let equation = ChemicalEquation::parse(" Fe + + Cl2 = FeCl3 + ").unwrap();
        assert_eq!(equation.compound_count(), 3);
    }

    #[test]
    fn test_separator_errors() {
        assert!(matches!(
            ChemicalEquation::parse("H2+O2"),
            Err(StoichError::Parse(ParseError::MissingSeparator(_)))
        ));
        assert!(matches!(
            ChemicalEquation::parse("H2=O2=H2O"),
            Err(StoichError::Parse(ParseError::MultipleSeparators(_)))
        ));
        assert!(matches!(
            ChemicalEquation::parse(" = H2O"),
            Err(StoichError::Parse(ParseError::EmptySide { .. }))
        ));
    }

    #[test]
    fn test_formula_errors_carry_the_fragment() {
        match ChemicalEquation::parse("H2+O2=H2Ox)") {
            Err(StoichError::Parse(ParseError::InFormula { fragment, source })) => {
                assert_eq!(fragment, "H2Ox)");
                assert!(matches!(*source, ParseError::UnknownElement { .. }));
            }
            other => panic!("unexpected result {:?}", other),
        }
        assert!(matches!(
            ChemicalEquation::parse("0H2+O2=H2O"),
            Err(StoichError::Parse(ParseError::InFormula { .. }))
        ));
    }

    #[test]
    fn test_different_elements_cannot_balance() {
        let err = ChemicalEquation::parse("H2 + O2 = H2O + NaCl").unwrap_err();
        match err {
            StoichError::Unbalanceable(reason) => assert!(reason.contains("Na, Cl only among products")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_balanced_text() {
        let equation = ChemicalEquation::parse("H2+O2=H2O").unwrap();
        assert_eq!(equation.balanced_text(&[2.0, 1.0, 2.0], 4), "2H2 + O2 -> 2H2O");
        assert_eq!(equation.balanced_text(&[1.0, 0.5, 1.0], 2), "H2 + 0.50O2 -> H2O");
    }
}
