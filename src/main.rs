mod cli;
mod logging;
mod report;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use dotenv::dotenv;
use report::CliReporter;
use snapsafe::ledger::HashLedger;
use snapsafe::{AppConfig, RunEngine};
use std::io::{self, Write};
use std::path::Path;
use std::process;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match snapsafe::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Run { dry_run, yes }) => {
            if !dry_run && !yes {
                let prompt = format!(
                    "Retire (DELETE) files on '{}' older than {} months?",
                    config.source_root, config.retention_months
                );
                match prompt_confirm(&prompt, Some(false)) {
                    Ok(true) => {}
                    _ => {
                        info!("Aborted.");
                        process::exit(0);
                    }
                }
            }
            if let Err(err) = run(&config, dry_run) {
                error!("Error: {}", err);
                process::exit(1);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        Some(Commands::LedgerCount) => {
            match HashLedger::load(Path::new(&config.ledger_path), true) {
                Ok(ledger) => info!("{} content hashes in ledger", ledger.len()),
                Err(err) => error!("Error reading ledger: {}", err),
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run(config: &AppConfig, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = RunEngine::new(config.clone()).with_dry_run(dry_run);
    let reporter = CliReporter::new();
    let run_report = engine.run(&reporter)?;

    println!();
    report::print_summary(&run_report);

    report::write_outcomes_csv(Path::new("run_report.csv"), &run_report.outcomes)?;
    info!("Outcome records written to run_report.csv");

    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
