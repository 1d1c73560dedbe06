use thiserror::Error;

/// grammar failures of formula and equation text
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty formula")]
    Empty,
    #[error("invalid character '{ch}' in '{formula}'")]
    InvalidCharacter { formula: String, ch: char },
    #[error("unbalanced parenthesis in '{0}'")]
    UnbalancedParenthesis(String),
    #[error("unknown element symbol '{symbol}' in '{formula}'")]
    UnknownElement { formula: String, symbol: String },
    #[error("lowercase letters '{token}' do not follow an element symbol in '{formula}'")]
    MisplacedLowercase { formula: String, token: String },
    #[error("empty parenthesized group in '{0}'")]
    EmptyGroup(String),
    #[error("subscript without an element or group in '{0}'")]
    DanglingSubscript(String),
    #[error("formula '{0}' contains no elements")]
    NoElements(String),
    #[error("subscript is too large in '{0}'")]
    SubscriptOverflow(String),
    #[error("no reactant/product separator ('=' or an arrow) in '{0}'")]
    MissingSeparator(String),
    #[error("more than one reactant/product separator in '{0}'")]
    MultipleSeparators(String),
    #[error("{side} side of '{equation}' contains no formulas")]
    EmptySide { side: String, equation: String },
    #[error("invalid coefficient '{0}': must be a positive number")]
    InvalidCoefficient(String),
    #[error("in '{fragment}': {source}")]
    InFormula {
        fragment: String,
        #[source]
        source: Box<ParseError>,
    },
}

/// every error kind the balancing-and-mass engine can surface
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoichError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("equation cannot be balanced: {0}")]
    Unbalanceable(String),
    #[error("singular matrix: {0}")]
    SingularMatrix(String),
    #[error("no solution: {0}")]
    NoSolution(String),
    #[error("could not scale coefficients to integers with multipliers up to {limit}")]
    NonIntegerConvergence { limit: u32 },
    #[error("invalid target compound: {0}")]
    InvalidTarget(String),
    #[error("invalid target mass {0}: must be a positive finite number")]
    InvalidMass(f64),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("another calculation is already running")]
    Busy,
    #[error("calculation was cancelled")]
    Cancelled,
    #[error("settings error: {0}")]
    Settings(String),
}

impl StoichError {
    /// errors after which Auto may try the next strategy
    pub fn is_strategy_failure(&self) -> bool {
        matches!(
            self,
            StoichError::SingularMatrix(_) | StoichError::NoSolution(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_errors_name_the_fragment() {
        let inner = ParseError::UnknownElement {
            formula: "H2Ox".to_string(),
            symbol: "Ox".to_string(),
        };
        let wrapped = ParseError::InFormula {
            fragment: "H2Ox".to_string(),
            source: Box::new(inner),
        };
        let message = StoichError::from(wrapped).to_string();
        assert!(message.contains("H2Ox"));
        assert!(message.contains("unknown element symbol 'Ox'"));
    }

    #[test]
    fn test_strategy_failures() {
        assert!(StoichError::SingularMatrix("x".into()).is_strategy_failure());
        assert!(StoichError::NoSolution("x".into()).is_strategy_failure());
        assert!(!StoichError::Cancelled.is_strategy_failure());
        assert!(!StoichError::Parse(ParseError::Empty).is_strategy_failure());
    }
}
