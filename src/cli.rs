/// interactive terminal menu
pub mod cli_main;
pub mod cli_examples;
