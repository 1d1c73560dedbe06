//! Parsing of chemical formulas like `H2SO4`, `Ca(OH)2` or `K4(Fe(CN)6)` into element counts.
//!
//! An element symbol is one uppercase letter optionally followed by lowercase letters and must be
//! present in the periodic table. A number after a symbol or after a closing bracket multiplies it
//! (absent number means 1); brackets nest. Trailing phase marks like `(g)` or `(aq)` are ignored.
use super::errors::ParseError;
use super::periodic_table::{atomic_mass, is_element_symbol};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// ordered mapping element symbol -> number of atoms, in first-seen order
pub type ElementCount = Vec<(String, u64)>;

static PHASE_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((?:g|l|s|c|aq)\)$").expect("phase mark pattern is valid"));

fn strip_phase_marks(formula: &str) -> &str {
    match PHASE_MARK.find(formula) {
        Some(mark) => &formula[..mark.start()],
        None => formula,
    }
}

fn add_atoms(counts: &mut ElementCount, symbol: &str, quantity: u64, formula: &str) -> Result<(), ParseError> {
    if let Some((_, count)) = counts.iter_mut().find(|(s, _)| s == symbol) {
        *count = count
            .checked_add(quantity)
            .ok_or_else(|| ParseError::SubscriptOverflow(formula.to_string()))?;
    } else {
        counts.push((symbol.to_string(), quantity));
    }
    Ok(())
}

// reads the digits starting at position i; returns (number, next position). No digits means 1
fn read_subscript(chars: &[char], mut i: usize, formula: &str) -> Result<(u64, usize), ParseError> {
    let start = i;
    let mut value: u64 = 0;
    while i < chars.len() && chars[i].is_ascii_digit() {
        let digit = chars[i].to_digit(10).unwrap_or(0) as u64;
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| ParseError::SubscriptOverflow(formula.to_string()))?;
        i += 1;
    }
    if i == start { Ok((1, i)) } else { Ok((value, i)) }
}

struct Group {
    counts: ElementCount,
    members: usize,
}

impl Group {
    fn new() -> Self {
        Group { counts: Vec::new(), members: 0 }
    }
}

/// Parses a formula into element counts. Pure function, fails with ParseError when the text is
/// empty, contains characters outside `[A-Za-z0-9()]`, has unbalanced brackets or unknown symbols.
pub fn parse_formula(text: &str) -> Result<ElementCount, ParseError> {
    let formula = strip_phase_marks(text);
    if formula.is_empty() {
        return Err(ParseError::Empty);
    }
    if let Some(ch) = formula.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '(' || *c == ')')) {
        return Err(ParseError::InvalidCharacter { formula: formula.to_string(), ch });
    }
    let chars: Vec<char> = formula.chars().collect();
    let mut stack: Vec<Group> = vec![Group::new()];
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_uppercase() {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                i += 1;
            }
            let symbol: String = chars[start..i].iter().collect();
            if !is_element_symbol(&symbol) {
                return Err(ParseError::UnknownElement { formula: formula.to_string(), symbol });
            }
            let (quantity, next) = read_subscript(&chars, i, formula)?;
            i = next;
            let top = stack.last_mut().ok_or_else(|| ParseError::UnbalancedParenthesis(formula.to_string()))?;
            add_atoms(&mut top.counts, &symbol, quantity, formula)?;
            top.members += 1;
        } else if c == '(' {
            stack.push(Group::new());
            i += 1;
        } else if c == ')' {
            if stack.len() < 2 {
                return Err(ParseError::UnbalancedParenthesis(formula.to_string()));
            }
            let group = stack.pop().ok_or_else(|| ParseError::UnbalancedParenthesis(formula.to_string()))?;
            if group.members == 0 {
                return Err(ParseError::EmptyGroup(formula.to_string()));
            }
            let (multiplier, next) = read_subscript(&chars, i + 1, formula)?;
            i = next;
            let top = stack.last_mut().ok_or_else(|| ParseError::UnbalancedParenthesis(formula.to_string()))?;
            for (symbol, count) in group.counts {
                let quantity = count
                    .checked_mul(multiplier)
                    .ok_or_else(|| ParseError::SubscriptOverflow(formula.to_string()))?;
                add_atoms(&mut top.counts, &symbol, quantity, formula)?;
            }
            top.members += 1;
        } else if c.is_ascii_lowercase() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_lowercase() {
                i += 1;
            }
            return Err(ParseError::MisplacedLowercase {
                formula: formula.to_string(),
                token: chars[start..i].iter().collect(),
            });
        } else {
            // a digit that follows neither a symbol nor a closing bracket
            return Err(ParseError::DanglingSubscript(formula.to_string()));
        }
    }
    if stack.len() != 1 {
        return Err(ParseError::UnbalancedParenthesis(formula.to_string()));
    }
    let counts: ElementCount = stack
        .pop()
        .map(|group| group.counts)
        .unwrap_or_default()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect();
    if counts.is_empty() {
        return Err(ParseError::NoElements(formula.to_string()));
    }
    // the total number of atoms must fit as well
    counts
        .iter()
        .try_fold(0u64, |total, (_, count)| total.checked_add(*count))
        .ok_or_else(|| ParseError::SubscriptOverflow(formula.to_string()))?;
    Ok(counts)
}

/// A parsed chemical formula: element counts in first-seen order and its molar mass.
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChemicalFormula {
    text: String,
    composition: ElementCount,
    molar_mass: f64,
}

impl ChemicalFormula {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let composition = parse_formula(text)?;
        let molar_mass = composition
            .iter()
            .filter_map(|(symbol, count)| atomic_mass(symbol).map(|m| m * *count as f64))
            .sum();
        Ok(Self {
            text: text.to_string(),
            composition,
            molar_mass,
        })
    }
    /// the text the formula was parsed from
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn composition(&self) -> &ElementCount {
        &self.composition
    }
    /// g/mol
    pub fn molar_mass(&self) -> f64 {
        self.molar_mass
    }
    /// number of atoms of the element, 0 if absent
    pub fn count(&self, symbol: &str) -> u64 {
        self.composition
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
    pub fn elements(&self) -> impl Iterator<Item = &str> {
        self.composition.iter().map(|(symbol, _)| symbol.as_str())
    }
    pub fn total_atoms(&self) -> u64 {
        self.composition.iter().map(|(_, count)| count).sum()
    }
    /// canonical text with brackets expanded: `Ca(OH)2` -> `CaO2H2`
    pub fn format(&self) -> String {
        self.composition
            .iter()
            .map(|(symbol, count)| {
                if *count == 1 {
                    symbol.clone()
                } else {
                    format!("{}{}", symbol, count)
                }
            })
            .collect()
    }
    /// mass fraction of every element, %
    pub fn mass_percent(&self) -> Vec<(String, f64)> {
        self.composition
            .iter()
            .map(|(symbol, count)| {
                let mass = atomic_mass(symbol).unwrap_or(0.0) * *count as f64;
                (symbol.clone(), 100.0 * mass / self.molar_mass)
            })
            .collect()
    }
    /// fraction of atoms of every element, %
    pub fn atomic_percent(&self) -> Vec<(String, f64)> {
        let total = self.total_atoms() as f64;
        self.composition
            .iter()
            .map(|(symbol, count)| (symbol.clone(), 100.0 * *count as f64 / total))
            .collect()
    }
}

impl fmt::Display for ChemicalFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn counts(pairs: &[(&str, u64)]) -> ElementCount {
        pairs.iter().map(|(s, c)| (s.to_string(), *c)).collect()
    }

    #[test]
    fn test_parse_formula() {
        assert_eq!(parse_formula("C6H8O6").unwrap(), counts(&[("C", 6), ("H", 8), ("O", 6)]));
        assert_eq!(parse_formula("Na(NO3)2").unwrap(), counts(&[("Na", 1), ("N", 2), ("O", 6)]));
        assert_eq!(parse_formula("H2O").unwrap(), counts(&[("H", 2), ("O", 1)]));
        assert_eq!(parse_formula("C5H6OOH").unwrap(), counts(&[("C", 5), ("H", 7), ("O", 2)]));
        assert_eq!(parse_formula("NaCl").unwrap(), counts(&[("Na", 1), ("Cl", 1)]));
    }

    #[test]
    fn test_nested_brackets() {
        assert_eq!(parse_formula("Ca(OH)2").unwrap(), counts(&[("Ca", 1), ("O", 2), ("H", 2)]));
        assert_eq!(
            parse_formula("K4(Fe(CN)6)").unwrap(),
            counts(&[("K", 4), ("Fe", 1), ("C", 6), ("N", 6)])
        );
        assert_eq!(
            parse_formula("(NH4)2(SO4)").unwrap(),
            counts(&[("N", 2), ("H", 8), ("S", 1), ("O", 4)])
        );
    }

    #[test]
    fn test_phase_marks_are_ignored() {
        assert_eq!(parse_formula("H2O(g)").unwrap(), counts(&[("H", 2), ("O", 1)]));
        assert_eq!(parse_formula("NaCl(aq)").unwrap(), counts(&[("Na", 1), ("Cl", 1)]));
        // uppercase S in brackets is sulfur, not a phase mark
        assert_eq!(parse_formula("Fe(S)").unwrap(), counts(&[("Fe", 1), ("S", 1)]));
    }

    #[test]
    fn test_grammar_errors() {
        assert_eq!(parse_formula(""), Err(ParseError::Empty));
        assert!(matches!(
            parse_formula("H2 O"),
            Err(ParseError::InvalidCharacter { ch: ' ', .. })
        ));
        assert!(matches!(parse_formula("H2O+"), Err(ParseError::InvalidCharacter { ch: '+', .. })));
        assert!(matches!(parse_formula("Ca(OH2"), Err(ParseError::UnbalancedParenthesis(_))));
        assert!(matches!(parse_formula("CaOH)2"), Err(ParseError::UnbalancedParenthesis(_))));
        assert!(matches!(
            parse_formula("H2Ox"),
            Err(ParseError::UnknownElement { ref symbol, .. }) if symbol == "Ox"
        ));
        assert!(matches!(parse_formula("xH2"), Err(ParseError::MisplacedLowercase { .. })));
        assert!(matches!(parse_formula("2H2"), Err(ParseError::DanglingSubscript(_))));
        assert!(matches!(parse_formula("Na()2"), Err(ParseError::EmptyGroup(_))));
        assert!(matches!(parse_formula("H0"), Err(ParseError::NoElements(_))));
        assert!(matches!(
            parse_formula("H99999999999999999999"),
            Err(ParseError::SubscriptOverflow(_))
        ));
        // every count fits, their sum does not
        assert!(matches!(
            parse_formula("H18446744073709551615O2"),
            Err(ParseError::SubscriptOverflow(_))
        ));
    }

    #[test]
    fn test_calculate_molar_mass() {
        let water = ChemicalFormula::parse("H2O(g)").unwrap();
        assert_relative_eq!(water.molar_mass(), 18.01528, epsilon = 1e-4);
        let salt = ChemicalFormula::parse("NaCl").unwrap();
        assert_relative_eq!(salt.molar_mass(), 58.44, epsilon = 1e-2);
        let acid = ChemicalFormula::parse("C6H8O6").unwrap();
        assert_relative_eq!(acid.molar_mass(), 176.12, epsilon = 1e-2);
        let nitrate = ChemicalFormula::parse("Ca(NO3)2").unwrap();
        assert_relative_eq!(nitrate.molar_mass(), 164.09, epsilon = 1e-2);
        let sulfuric = ChemicalFormula::parse("H2SO4").unwrap();
        assert_relative_eq!(sulfuric.molar_mass(), 98.079, epsilon = 1e-3);
    }

    #[test]
    fn test_percents_sum_to_hundred() {
        let formula = ChemicalFormula::parse("Ca(NO3)2").unwrap();
        let mass: f64 = formula.mass_percent().iter().map(|(_, p)| p).sum();
        let atoms: f64 = formula.atomic_percent().iter().map(|(_, p)| p).sum();
        assert_relative_eq!(mass, 100.0, epsilon = 1e-9);
        assert_relative_eq!(atoms, 100.0, epsilon = 1e-9);
        assert_relative_eq!(formula.atomic_percent()[0].1, 100.0 / 9.0, epsilon = 1e-9);
    }

    #[test]
    fn test_format_is_stable_under_reparsing() {
        for text in ["Ca(OH)2", "K4(Fe(CN)6)", "C5H6OOH", "H2SO4", "(NH4)2SO4", "Fe"] {
            let once = ChemicalFormula::parse(text).unwrap().format();
            let twice = ChemicalFormula::parse(&once).unwrap().format();
            assert_eq!(once, twice);
        }
        assert_eq!(ChemicalFormula::parse("Ca(OH)2").unwrap().format(), "CaO2H2");
    }

    #[test]
    fn test_accessors() {
        let formula = ChemicalFormula::parse("Fe2(SO4)3").unwrap();
        assert_eq!(formula.count("O"), 12);
        assert_eq!(formula.count("Cl"), 0);
        assert_eq!(formula.total_atoms(), 17);
        assert_eq!(formula.elements().collect::<Vec<_>>(), vec!["Fe", "S", "O"]);
        assert_eq!(formula.to_string(), "Fe2(SO4)3");
    }
}
