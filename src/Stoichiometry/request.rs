//! Immutable description of one calculation, as passed to the engine.
use super::errors::StoichError;
use super::solvers::BalancingMethod;
use crate::settings::EngineSettings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// what to compute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalcMode {
    /// composition and molar mass of a single formula
    Formula,
    /// coefficients only
    Balance,
    /// coefficients and the masses needed for the target amount
    #[default]
    Masses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Auto,
    Inv,
    GPinv,
    PPinv,
    Comb,
}

/// how the coefficients are obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// computed from scratch, coefficients written in the equation are ignored
    #[default]
    Balance,
    /// coefficients written in the equation are verified
    Check,
    /// coefficients written in the equation are used as they are
    Force,
}

fn unknown(kind: &str, value: &str) -> StoichError {
    StoichError::InvalidRequest(format!("unknown {} '{}'", kind, value))
}

impl FromStr for CalcMode {
    type Err = StoichError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "formula" => Ok(CalcMode::Formula),
            "balance" => Ok(CalcMode::Balance),
            "masses" => Ok(CalcMode::Masses),
            _ => Err(unknown("mode", s)),
        }
    }
}

impl FromStr for Algorithm {
    type Err = StoichError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Algorithm::Auto),
            "inv" | "inverse" => Ok(Algorithm::Inv),
            "gpinv" => Ok(Algorithm::GPinv),
            "ppinv" => Ok(Algorithm::PPinv),
            "comb" | "combinatorial" => Ok(Algorithm::Comb),
            _ => Err(unknown("algorithm", s)),
        }
    }
}

impl FromStr for RunMode {
    type Err = StoichError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "balance" => Ok(RunMode::Balance),
            "check" => Ok(RunMode::Check),
            "force" => Ok(RunMode::Force),
            _ => Err(unknown("run mode", s)),
        }
    }
}

/// One calculation. JSON field names are camelCase; `equation`, `targetNum` and `maxComb` are
/// accepted for the equation text, the target index and the combinatorial bound. Absent fields take the defaults of
/// [`EngineSettings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Request {
    #[serde(alias = "equation")]
    pub equation_text: String,
    pub mode: CalcMode,
    pub algorithm: Algorithm,
    pub run_mode: RunMode,
    #[serde(alias = "targetNum")]
    pub target_compound_index: usize,
    pub target_mass: f64,
    pub intify: bool,
    pub output_precision: usize,
    /// exponent of the tolerance 10^(-float_tolerance)
    pub float_tolerance: u32,
    #[serde(alias = "maxComb")]
    pub combinatorial_bound: u32,
    pub intify_limit: u32,
    pub checkpoint_interval: u64,
}

impl Default for Request {
    fn default() -> Self {
        Request::from_settings("", &EngineSettings::default())
    }
}

impl Request {
    pub fn new(equation_text: &str) -> Self {
        Request {
            equation_text: equation_text.to_string(),
            ..Request::default()
        }
    }

    pub fn from_settings(equation_text: &str, settings: &EngineSettings) -> Self {
        Request {
            equation_text: equation_text.to_string(),
            mode: settings.mode,
            algorithm: settings.algorithm,
            run_mode: settings.run_mode,
            target_compound_index: settings.target_index,
            target_mass: settings.target_mass,
            intify: settings.intify,
            output_precision: settings.precision,
            float_tolerance: settings.float_tolerance,
            combinatorial_bound: settings.combinatorial_bound,
            intify_limit: settings.intify_limit,
            checkpoint_interval: settings.checkpoint_interval,
        }
    }

    pub fn with_mode(mut self, mode: CalcMode) -> Self {
        self.mode = mode;
        self
    }
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }
    pub fn with_target(mut self, index: usize, mass: f64) -> Self {
        self.target_compound_index = index;
        self.target_mass = mass;
        self
    }
    pub fn with_combinatorial_bound(mut self, bound: u32) -> Self {
        self.combinatorial_bound = bound;
        self
    }

    pub fn balancing_method(&self) -> BalancingMethod {
        match self.algorithm {
            Algorithm::Auto => BalancingMethod::Auto(self.combinatorial_bound),
            Algorithm::Inv => BalancingMethod::Inverse,
            Algorithm::GPinv => BalancingMethod::GeneralizedPseudoInverse,
            Algorithm::PPinv => BalancingMethod::PartialPseudoInverse,
            Algorithm::Comb => BalancingMethod::Combinatorial(self.combinatorial_bound),
        }
    }

    /// parameter checks that need no parsing
    pub fn validate(&self) -> Result<(), StoichError> {
        // under Auto a zero bound only drops the combinatorial fallback
        if self.algorithm == Algorithm::Comb && self.combinatorial_bound == 0 {
            return Err(StoichError::InvalidRequest(
                "combinatorial bound must be positive".to_string(),
            ));
        }
        if self.mode == CalcMode::Masses && !(self.target_mass.is_finite() && self.target_mass > 0.0) {
            return Err(StoichError::InvalidMass(self.target_mass));
        }
        Ok(())
    }
}
