use clap::Parser;
use rplan_runner::{execute_plan, execute_tree, execute_verify, init_tracing, Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let result = match &cli.command {
        Commands::Plan(command) => execute_plan(command),
        Commands::Verify(command) => execute_verify(command),
        Commands::Tree(command) => execute_tree(command),
    };

    match result {
        Ok(output) => {
            println!("{output}");
        }
        Err(error) => {
            eprintln!("{error}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
