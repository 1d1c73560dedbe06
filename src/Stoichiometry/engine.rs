//! # Balancing engine
//!
//! Runs one [`Request`] through the stages
//! `Idle -> Parsing -> Solving -> Normalizing -> (MassScaling) -> Formatting -> Done`.
//! The cancellation token is checked at every stage boundary and inside the combinatorial
//! search; once it is set the run ends in `Cancelled` and returns a cancelled result with no
//! partial data. Errors end the run in `Failed` and are reported inside the result.
//!
//! [`BalancingEngine`] lets only one calculation run at a time: [`BalancingEngine::solve`]
//! waits for the running one, [`BalancingEngine::try_solve`] returns a Busy result instead.
//! `cancel` and `is_running` may be called from any thread.
use super::cancellation::CancellationToken;
use super::equation_parser::ChemicalEquation;
use super::errors::StoichError;
use super::formula_parser::ChemicalFormula;
use super::masses::{compute_masses, validate_target};
use super::normalizer::{intify_tolerance, normalize};
use super::report::{balance_report, formula_report, masses_report};
use super::request::{CalcMode, Request, RunMode};
use super::solvers::{CoefficientVector, SolveContext, balance, tolerance_epsilon};
use super::stoich_matrix::StoichiometricMatrix;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestrationState {
    Idle,
    Parsing,
    Solving,
    Normalizing,
    MassScaling,
    Formatting,
    Done,
    Cancelled,
    Failed,
}

/// state of one run, with every state it went through
#[derive(Debug, Clone)]
pub struct Orchestration {
    token: CancellationToken,
    history: Vec<OrchestrationState>,
}

impl Orchestration {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            history: vec![OrchestrationState::Idle],
        }
    }
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
    pub fn state(&self) -> OrchestrationState {
        *self.history.last().unwrap_or(&OrchestrationState::Idle)
    }
    pub fn history(&self) -> &[OrchestrationState] {
        &self.history
    }
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state(),
            OrchestrationState::Done | OrchestrationState::Cancelled | OrchestrationState::Failed
        )
    }

    /// moves to `next` unless cancellation was requested, then moves to Cancelled
    pub fn advance(&mut self, next: OrchestrationState) -> Result<(), StoichError> {
        if self.is_finished() {
            return Err(StoichError::InvalidRequest(format!(
                "run already finished in state {:?}",
                self.state()
            )));
        }
        if self.token.is_cancelled() {
            self.enter(OrchestrationState::Cancelled);
            return Err(StoichError::Cancelled);
        }
        self.enter(next);
        Ok(())
    }

    fn enter(&mut self, next: OrchestrationState) {
        debug!("{:?} -> {:?}", self.state(), next);
        self.history.push(next);
    }

    fn finish_with(&mut self, error: &StoichError) {
        if self.is_finished() {
            return;
        }
        let last = if *error == StoichError::Cancelled {
            OrchestrationState::Cancelled
        } else {
            OrchestrationState::Failed
        };
        self.enter(last);
    }
}

/// one row of the per-compound table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularRow {
    pub formula: String,
    pub molar: f64,
    pub masses: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub success: bool,
    pub cancelled: bool,
    /// empty on success, a warning when the coefficients could not be made integer
    pub message: String,
    pub details: String,
    pub method: Option<String>,
    pub coefficients: Vec<f64>,
    pub tabular: Vec<TabularRow>,
    #[serde(skip)]
    pub error: Option<StoichError>,
}

impl CalculationResult {
    fn empty() -> Self {
        Self {
            success: false,
            cancelled: false,
            message: String::new(),
            details: String::new(),
            method: None,
            coefficients: Vec::new(),
            tabular: Vec::new(),
            error: None,
        }
    }

    pub fn failure(error: StoichError) -> Self {
        if error == StoichError::Cancelled {
            return Self::cancelled();
        }
        Self {
            message: error.to_string(),
            error: Some(error),
            ..Self::empty()
        }
    }

    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            message: StoichError::Cancelled.to_string(),
            ..Self::empty()
        }
    }

    pub fn to_json(&self) -> Result<String, StoichError> {
        serde_json::to_string_pretty(self).map_err(|e| StoichError::Settings(e.to_string()))
    }
}

fn formula_mode(request: &Request, orchestration: &mut Orchestration) -> Result<CalculationResult, StoichError> {
    let formula = ChemicalFormula::parse(request.equation_text.trim())?;
    orchestration.advance(OrchestrationState::Formatting)?;
    let details = formula_report(&formula, request.output_precision);
    orchestration.advance(OrchestrationState::Done)?;
    Ok(CalculationResult {
        success: true,
        details,
        tabular: vec![TabularRow {
            formula: formula.text().to_string(),
            molar: formula.molar_mass(),
            masses: 0.0,
        }],
        ..CalculationResult::empty()
    })
}

fn reaction_mode(request: &Request, orchestration: &mut Orchestration) -> Result<CalculationResult, StoichError> {
    let equation = ChemicalEquation::parse(&request.equation_text)?;
    let masses_wanted = request.mode == CalcMode::Masses;
    if masses_wanted {
        validate_target(&equation, request.target_compound_index, request.target_mass)?;
    }
    let matrix = StoichiometricMatrix::build(&equation);
    let epsilon = tolerance_epsilon(request.float_tolerance);

    orchestration.advance(OrchestrationState::Solving)?;
    let supplied = CoefficientVector::new(equation.initial_coefficients().to_vec());
    let (raw, method) = match request.run_mode {
        RunMode::Balance => {
            let ctx = SolveContext::new(epsilon, orchestration.token().clone())
                .with_checkpoint_interval(request.checkpoint_interval);
            let solution = balance(&matrix, request.balancing_method(), &ctx)?;
            (solution.coefficients, Some(solution.method))
        }
        RunMode::Check => {
            if !matrix.is_balanced_by(supplied.as_slice(), epsilon) {
                let residual = matrix.residual(supplied.as_slice());
                return Err(StoichError::Unbalanceable(format!(
                    "supplied coefficients {} leave element residual {:?}",
                    supplied,
                    residual.as_slice()
                )));
            }
            (supplied, None)
        }
        RunMode::Force => (supplied, None),
    };

    orchestration.advance(OrchestrationState::Normalizing)?;
    let mut message = String::new();
    let coefficients = if request.run_mode == RunMode::Balance {
        match normalize(&raw, intify_tolerance(epsilon), request.intify, request.intify_limit) {
            Ok(vector) => vector,
            Err(e @ StoichError::NonIntegerConvergence { .. }) => {
                warn!("{}; keeping real coefficients {}", e, raw);
                message = format!("warning: {}", e);
                raw.sign_fixed()
            }
            Err(e) => return Err(e),
        }
    } else {
        raw
    };
    let coefficients = coefficients.into_vec();

    let masses = if masses_wanted {
        orchestration.advance(OrchestrationState::MassScaling)?;
        Some(compute_masses(
            &equation,
            &coefficients,
            request.target_compound_index,
            request.target_mass,
        )?)
    } else {
        None
    };

    orchestration.advance(OrchestrationState::Formatting)?;
    let precision = request.output_precision;
    let mut details = balance_report(&equation, method, &coefficients, precision);
    let tabular = match &masses {
        Some(masses) => {
            details.push('\n');
            details.push_str(&masses_report(masses, precision));
            masses
                .iter()
                .map(|m| TabularRow {
                    formula: m.formula.clone(),
                    molar: m.molar_mass,
                    masses: m.mass,
                })
                .collect()
        }
        None => equation
            .compounds()
            .map(|f| TabularRow {
                formula: f.text().to_string(),
                molar: f.molar_mass(),
                masses: 0.0,
            })
            .collect(),
    };
    orchestration.advance(OrchestrationState::Done)?;
    Ok(CalculationResult {
        success: true,
        message,
        details,
        method: method.map(str::to_string),
        coefficients,
        tabular,
        ..CalculationResult::empty()
    })
}

fn run(request: &Request, orchestration: &mut Orchestration) -> Result<CalculationResult, StoichError> {
    request.validate()?;
    orchestration.advance(OrchestrationState::Parsing)?;
    match request.mode {
        CalcMode::Formula => formula_mode(request, orchestration),
        CalcMode::Balance | CalcMode::Masses => reaction_mode(request, orchestration),
    }
}

/// Runs a request to completion inside `orchestration`. Never fails: errors and
/// cancellation are folded into the returned result.
pub fn calculate(request: &Request, orchestration: &mut Orchestration) -> CalculationResult {
    info!("calculation {:?} of '{}'", request.mode, request.equation_text);
    match run(request, orchestration) {
        Ok(result) => result,
        Err(error) => {
            orchestration.finish_with(&error);
            if error == StoichError::Cancelled {
                info!("calculation was cancelled");
            } else {
                warn!("calculation failed: {}", error);
            }
            CalculationResult::failure(error)
        }
    }
}

// calls inside `solve`/`try_solve`: the token of the running one and the number still
// waiting for the serial lock
#[derive(Debug, Default)]
struct Flight {
    token: Option<CancellationToken>,
    queued: usize,
    cancel_pending: bool,
}

/// Single-flight front end over [`calculate`]. Share it between threads with `Arc`.
#[derive(Debug, Default)]
pub struct BalancingEngine {
    serial: Mutex<()>,
    flight: Mutex<Flight>,
}

impl BalancingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn flight(&self) -> MutexGuard<'_, Flight> {
        self.flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // registers a call before it competes for the serial lock
    fn enqueue(&self) {
        self.flight().queued += 1;
    }

    // a call that gave up before running
    fn withdraw(&self) {
        let mut flight = self.flight();
        flight.queued = flight.queued.saturating_sub(1);
        if flight.queued == 0 && flight.token.is_none() {
            flight.cancel_pending = false;
        }
    }

    fn run_exclusive(&self, request: &Request) -> CalculationResult {
        let token = CancellationToken::new();
        {
            let mut flight = self.flight();
            flight.queued = flight.queued.saturating_sub(1);
            // a cancel that arrived before any token was installed
            if std::mem::take(&mut flight.cancel_pending) {
                token.cancel();
            }
            flight.token = Some(token.clone());
        }
        let mut orchestration = Orchestration::new(token);
        let result = calculate(request, &mut orchestration);
        debug!("run finished, states {:?}", orchestration.history());
        self.flight().token = None;
        result
    }

    /// Blocking entry point; waits while another calculation is running.
    pub fn solve(&self, request: &Request) -> CalculationResult {
        self.enqueue();
        let _guard = self.serial.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_exclusive(request)
    }

    /// Like [`solve`](Self::solve) but returns a Busy failure instead of waiting.
    pub fn try_solve(&self, request: &Request) -> CalculationResult {
        self.enqueue();
        let _guard = match self.serial.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                self.withdraw();
                return CalculationResult::failure(StoichError::Busy);
            }
        };
        self.run_exclusive(request)
    }

    /// Requests cancellation of the running calculation. When a call has entered `solve` but
    /// not started yet, the request is kept for it. No-op when idle.
    pub fn cancel(&self) {
        let mut flight = self.flight();
        if let Some(token) = flight.token.as_ref() {
            info!("cancellation requested");
            token.cancel();
            return;
        }
        if flight.queued > 0 {
            info!("cancellation requested before the calculation started");
            flight.cancel_pending = true;
        }
    }

    /// true from the moment a call enters `solve` until the last one returns
    pub fn is_running(&self) -> bool {
        let flight = self.flight();
        flight.token.is_some() || flight.queued > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_before_the_token_is_installed() {
        let engine = BalancingEngine::new();
        engine.enqueue();
        assert!(engine.is_running());
        engine.cancel();
        let result = engine.run_exclusive(&Request::new("H2+O2=H2O").with_target(2, 18.0));
        assert!(result.cancelled);
        assert!(!engine.is_running());
        // the pending request was used up by that call
        let result = engine.solve(&Request::new("H2+O2=H2O").with_target(2, 18.0));
        assert!(result.success, "{}", result.message);
    }

    #[test]
    fn test_withdrawn_call_drops_the_pending_cancel() {
        let engine = BalancingEngine::new();
        engine.enqueue();
        engine.cancel();
        engine.withdraw();
        assert!(!engine.is_running());
        let result = engine.solve(&Request::new("H2+O2=H2O").with_target(2, 18.0));
        assert!(result.success, "{}", result.message);
    }

    #[test]
    fn test_idle_cancel_is_a_no_op() {
        let engine = BalancingEngine::new();
        engine.cancel();
        assert!(!engine.is_running());
        assert!(engine.solve(&Request::new("Fe+Cl2=FeCl3").with_target(0, 1.0)).success);
    }
}
