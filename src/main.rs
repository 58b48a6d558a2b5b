//! Main entry point for recorddiff CLI

use clap::Parser;
use recorddiff::cli::{log_level, Cli};
use recorddiff::commands::execute_command;

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log_level(cli.verbose))
        .init();

    // Execute the command
    if let Err(e) = execute_command(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
