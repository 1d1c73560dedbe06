use super::cli_main::{get_user_input, prompt};
use crate::Examples::stoichiometry_examples::stoich_examples;

pub fn examples_menu() {
    loop {
        println!("\n=== Examples ===");
        println!("1. Formula and molar mass");
        println!("2. Balancing with every algorithm");
        println!("3. Masses of reagents");
        println!("4. Cancelling a combinatorial search");
        println!("5. Result as JSON");
        println!("0. Back to main menu");
        prompt("Enter your choice: ");

        let choice = get_user_input();
        match choice.trim() {
            "1" => stoich_examples(0),
            "2" => stoich_examples(1),
            "3" => stoich_examples(2),
            "4" => stoich_examples(3),
            "5" => stoich_examples(4),
            "0" => break,
            _ => println!("Invalid choice. Please try again."),
        }
    }
}
