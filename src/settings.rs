//! # Settings Module
//!
//! ## Purpose
//! Keeps the default parameters of calculations in one JSON file, so that the command line
//! front end and the examples start from the same values.
//!
//! ## Architecture
//! - **EngineSettings**: serializable defaults of a [`Request`](crate::Stoichiometry::request::Request)
//! - **SettingsManager**: loads, validates, updates and saves the settings file
//!
//! ## Configuration Format
//! ```json
//! {
//!   "algorithm": "auto",
//!   "run_mode": "balance",
//!   "mode": "masses",
//!   "target_index": 0,
//!   "target_mass": 1.0,
//!   "intify": true,
//!   "precision": 4,
//!   "float_tolerance": 8,
//!   "combinatorial_bound": 15,
//!   "intify_limit": 500,
//!   "checkpoint_interval": 16384,
//!   "loglevel": "info"
//! }
//! ```
//!
//! ## Usage Pattern
//! ```rust, ignore
//! use SynthCalc::settings::SettingsManager;
//!
//! let mut manager = SettingsManager::new()?;
//! manager.set_parameter("Algorithm", "comb")?;
//! manager.save_config()?;
//! ```
use crate::Stoichiometry::errors::StoichError;
use crate::Stoichiometry::normalizer::DEFAULT_INTIFY_LIMIT;
use crate::Stoichiometry::request::{Algorithm, CalcMode, RunMode};
use crate::Stoichiometry::solvers::{DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_COMBINATORIAL_BOUND};
use log::{LevelFilter, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "synthcalc_config.json";

/// Default parameters of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub algorithm: Algorithm,
    pub run_mode: RunMode,
    pub mode: CalcMode,
    pub target_index: usize,
    pub target_mass: f64,
    pub intify: bool,
    pub precision: usize,
    pub float_tolerance: u32,
    pub combinatorial_bound: u32,
    pub intify_limit: u32,
    pub checkpoint_interval: u64,
    pub loglevel: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Auto,
            run_mode: RunMode::Balance,
            mode: CalcMode::Masses,
            target_index: 0,
            target_mass: 1.0,
            intify: true,
            precision: 4,
            float_tolerance: 8,
            combinatorial_bound: DEFAULT_COMBINATORIAL_BOUND,
            intify_limit: DEFAULT_INTIFY_LIMIT,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            loglevel: "info".to_string(),
        }
    }
}

/// "debug" | "info" | "warn" | "error" | "off" | "none"
pub fn log_level_filter(level: &str) -> Result<LevelFilter, StoichError> {
    match level.trim().to_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        _ => Err(StoichError::Settings(format!(
            "loglevel must be debug, info, warn, error, off or none, got '{}'",
            level
        ))),
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), StoichError> {
        if self.combinatorial_bound == 0 {
            return Err(StoichError::Settings("combinatorial bound must be positive".to_string()));
        }
        if !(self.target_mass.is_finite() && self.target_mass > 0.0) {
            return Err(StoichError::Settings(format!(
                "target mass must be positive, got {}",
                self.target_mass
            )));
        }
        if self.intify_limit == 0 || self.checkpoint_interval == 0 {
            return Err(StoichError::Settings(
                "intify limit and checkpoint interval must be positive".to_string(),
            ));
        }
        log_level_filter(&self.loglevel)?;
        Ok(())
    }
}

fn settings_error(e: impl std::fmt::Display) -> StoichError {
    StoichError::Settings(e.to_string())
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, StoichError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| StoichError::Settings(format!("invalid value '{}' for {}", value, name)))
}

/// Settings together with the file they are persisted in.
#[derive(Debug, Clone)]
pub struct SettingsManager {
    settings: EngineSettings,
    config_file: String,
}

impl SettingsManager {
    /// Loads `synthcalc_config.json` from the working directory, defaults when it is absent.
    pub fn new() -> Result<Self, StoichError> {
        Self::with_config_file(DEFAULT_CONFIG_FILE)
    }

    /// Same as [`new`](Self::new) with another file. A file that exists but cannot be read or
    /// holds invalid settings is an error.
    pub fn with_config_file(config_file: &str) -> Result<Self, StoichError> {
        let settings = Self::load_config(config_file)?;
        settings.validate()?;
        Ok(Self {
            settings,
            config_file: config_file.to_string(),
        })
    }

    fn load_config(config_file: &str) -> Result<EngineSettings, StoichError> {
        if Path::new(config_file).exists() {
            let content = fs::read_to_string(config_file).map_err(settings_error)?;
            let settings: EngineSettings = serde_json::from_str(&content).map_err(settings_error)?;
            info!("settings loaded from {}", config_file);
            Ok(settings)
        } else {
            Ok(EngineSettings::default())
        }
    }

    pub fn save_config(&self) -> Result<(), StoichError> {
        let content = serde_json::to_string_pretty(&self.settings).map_err(settings_error)?;
        fs::write(&self.config_file, content).map_err(settings_error)?;
        Ok(())
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// replaces the settings if they are valid, the old ones are kept otherwise
    pub fn update(&mut self, settings: EngineSettings) -> Result<(), StoichError> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Sets one parameter by its display name (as shown in the settings menu).
    pub fn set_parameter(&mut self, name: &str, value: &str) -> Result<(), StoichError> {
        let mut settings = self.settings.clone();
        match name {
            "Algorithm" => settings.algorithm = value.parse()?,
            "Run mode" => settings.run_mode = value.parse()?,
            "Mode" => settings.mode = value.parse()?,
            "Target index" => settings.target_index = parse_value(name, value)?,
            "Target mass" => settings.target_mass = parse_value(name, value)?,
            "Intify" => settings.intify = parse_value(name, value)?,
            "Precision" => settings.precision = parse_value(name, value)?,
            "Float tolerance" => settings.float_tolerance = parse_value(name, value)?,
            "Combinatorial bound" => settings.combinatorial_bound = parse_value(name, value)?,
            "Intify limit" => settings.intify_limit = parse_value(name, value)?,
            "Checkpoint interval" => settings.checkpoint_interval = parse_value(name, value)?,
            "Log level" => settings.loglevel = value.trim().to_string(),
            _ => return Err(StoichError::Settings(format!("unknown parameter: {}", name))),
        }
        self.update(settings)
    }

    /// display names accepted by [`set_parameter`](Self::set_parameter)
    pub fn parameter_names() -> &'static [&'static str] {
        &[
            "Algorithm",
            "Run mode",
            "Mode",
            "Target index",
            "Target mass",
            "Intify",
            "Precision",
            "Float tolerance",
            "Combinatorial bound",
            "Intify limit",
            "Checkpoint interval",
            "Log level",
        ]
    }

    /// Restores the defaults and saves them.
    pub fn reset_to_defaults(&mut self) -> Result<(), StoichError> {
        self.settings = EngineSettings::default();
        self.save_config()
    }
}
