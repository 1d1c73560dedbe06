use SynthCalc::Stoichiometry::engine::BalancingEngine;
use SynthCalc::Stoichiometry::errors::StoichError;
use SynthCalc::Stoichiometry::request::Request;
use SynthCalc::cli::cli_main::run_interactive_menu;
use SynthCalc::settings::{SettingsManager, log_level_filter};
use log::{error, info};
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};
use std::fs;

fn init_logger(loglevel: &str) -> Result<(), StoichError> {
    let log_option = log_level_filter(loglevel)?;
    // a second init fails harmlessly, the installed logger stays
    let _ = CombinedLogger::init(vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
    Ok(())
}

/// runs the JSON request stored in `path`, returns the result as JSON
fn run_request_file(path: &str) -> Result<String, StoichError> {
    let content = fs::read_to_string(path)
        .map_err(|e| StoichError::InvalidRequest(format!("cannot read {}: {}", path, e)))?;
    let request: Request = serde_json::from_str(&content)
        .map_err(|e| StoichError::InvalidRequest(format!("{}: {}", path, e)))?;
    let result = BalancingEngine::new().solve(&request);
    result.to_json()
}

pub fn main() {
    let manager = match SettingsManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = init_logger(&manager.settings().loglevel) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    info!("settings from {}", manager.config_file());

    match std::env::args().nth(1) {
        Some(path) => match run_request_file(&path) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => run_interactive_menu(manager),
    }
}
