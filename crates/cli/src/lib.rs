pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "riskline",
    about = "Riskline operator CLI",
    long_about = "Operate the Riskline underwriting pipeline: migrations, policy ingest, \
                  promotion, rule evaluation, reporting, and the interactive agent shell.",
    after_help = "Examples:\n  riskline migrate\n  riskline underwrite --rule-set risk_accumulation\n  riskline agent"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo policy dataset into the staging store")]
    Seed,
    #[command(about = "Fetch policies from the source API and stage the raw documents")]
    Fetch,
    #[command(about = "Promote staged policy documents into the relational policy store")]
    Promote,
    #[command(about = "Underwrite every stored policy and persist SAFE/NOT SAFE decisions")]
    Underwrite {
        #[arg(long, help = "Override the configured rule set (hard_gate|risk_accumulation)")]
        rule_set: Option<String>,
    },
    #[command(about = "Print the aggregated underwriting summary")]
    Summary,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, source credential readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Start the interactive underwriting agent shell")]
    Agent,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Fetch => commands::fetch::run(),
        Command::Promote => commands::promote::run(),
        Command::Underwrite { rule_set } => commands::underwrite::run(rule_set.as_deref()),
        Command::Summary => commands::summary::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Agent => commands::agent::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
