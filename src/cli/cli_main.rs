use super::cli_examples::examples_menu;
use crate::Stoichiometry::engine::{BalancingEngine, CalculationResult};
use crate::Stoichiometry::request::{Algorithm, CalcMode, Request};
use crate::settings::SettingsManager;
use std::io::{self, Write};

pub fn run_interactive_menu(mut manager: SettingsManager) {
    let engine = BalancingEngine::new();
    loop {
        show_main_menu();
        let choice = get_user_input();

        match choice.trim() {
            "1" => formula_task(&engine, &manager),
            "2" => balance_task(&engine, &manager),
            "3" => masses_task(&engine, &manager),
            "4" => examples_menu(),
            "5" => settings_menu(&mut manager),
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
}
/* colors
Blue (\x1b[34m) - Welcome header text

Yellow (\x1b[33m) - Menu options

Cyan (\x1b[36m) - prompts

Red (\x1b[31m) - failures
*/
fn show_main_menu() {
    println!(
        "\x1b[34m\n Welcome to SynthCalc: balancing of chemical equations,\n
    molar masses and masses of reagents for a synthesis \n \x1b[0m"
    );
    println!("\x1b[33m1. Formula\x1b[0m");
    println!("\x1b[33m2. Balance\x1b[0m");
    println!("\x1b[33m3. Masses\x1b[0m");
    println!("\x1b[33m4. Examples\x1b[0m");
    println!("\x1b[33m5. Settings\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
    prompt("Enter your choice: ");
}

pub(crate) fn prompt(text: &str) {
    print!("\x1b[36m{}\x1b[0m", text);
    let _ = io::stdout().flush();
}

/// one line from stdin; end of input reads as "0" so that every menu can be left
pub(crate) fn get_user_input() -> String {
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) | Err(_) => "0".to_string(),
        Ok(_) => input,
    }
}

fn ask(text: &str) -> String {
    prompt(text);
    get_user_input().trim().to_string()
}

fn print_result(result: &CalculationResult) {
    if result.success {
        println!("{}", result.details);
        if !result.message.is_empty() {
            println!("\x1b[33m{}\x1b[0m", result.message);
        }
    } else {
        println!("\x1b[31m{}\x1b[0m", result.message);
    }
}

fn formula_task(engine: &BalancingEngine, manager: &SettingsManager) {
    let formula = ask("Formula (e.g. Ca(OH)2): ");
    let request = Request::from_settings(&formula, manager.settings()).with_mode(CalcMode::Formula);
    print_result(&engine.solve(&request));
}

fn algorithm_choice(manager: &SettingsManager) -> Algorithm {
    let default = manager.settings().algorithm;
    let answer = ask("Algorithm [auto|inv|gpinv|ppinv|comb], empty for default: ");
    if answer.is_empty() {
        return default;
    }
    answer.parse().unwrap_or_else(|e| {
        println!("{}, using {:?}", e, default);
        default
    })
}

fn balance_task(engine: &BalancingEngine, manager: &SettingsManager) {
    let equation = ask("Equation (e.g. H2 + O2 = H2O): ");
    let algorithm = algorithm_choice(manager);
    let request = Request::from_settings(&equation, manager.settings())
        .with_mode(CalcMode::Balance)
        .with_algorithm(algorithm);
    print_result(&engine.solve(&request));
}

fn masses_task(engine: &BalancingEngine, manager: &SettingsManager) {
    let equation = ask("Equation (e.g. H2 + O2 = H2O): ");
    let algorithm = algorithm_choice(manager);
    let index = match ask("Index of the target compound, from 0: ").parse::<usize>() {
        Ok(index) => index,
        Err(_) => {
            println!("\x1b[31mindex must be a non-negative integer\x1b[0m");
            return;
        }
    };
    let mass = match ask("Target mass, g: ").parse::<f64>() {
        Ok(mass) => mass,
        Err(_) => {
            println!("\x1b[31mmass must be a number\x1b[0m");
            return;
        }
    };
    let request = Request::from_settings(&equation, manager.settings())
        .with_mode(CalcMode::Masses)
        .with_algorithm(algorithm)
        .with_target(index, mass);
    print_result(&engine.solve(&request));
}

fn settings_menu(manager: &mut SettingsManager) {
    loop {
        println!("\n=== Settings ({}) ===", manager.config_file());
        println!("{:#?}", manager.settings());
        for (i, name) in SettingsManager::parameter_names().iter().enumerate() {
            println!("{}. {}", i + 1, name);
        }
        println!("s. Save");
        println!("r. Reset to defaults");
        println!("0. Back to main menu");
        let choice = ask("Enter your choice: ");
        match choice.as_str() {
            "0" => break,
            "s" => match manager.save_config() {
                Ok(()) => println!("saved"),
                Err(e) => println!("\x1b[31m{}\x1b[0m", e),
            },
            "r" => {
                if let Err(e) = manager.reset_to_defaults() {
                    println!("\x1b[31m{}\x1b[0m", e);
                }
            }
            other => {
                let names = SettingsManager::parameter_names();
                match other.parse::<usize>().ok().filter(|i| *i >= 1 && *i <= names.len()) {
                    Some(i) => {
                        let value = ask(&format!("{}: ", names[i - 1]));
                        if let Err(e) = manager.set_parameter(names[i - 1], &value) {
                            println!("\x1b[31m{}\x1b[0m", e);
                        }
                    }
                    None => println!("Invalid choice. Please try again."),
                }
            }
        }
    }
}
