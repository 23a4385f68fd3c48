pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "leadline",
    about = "Leadline operator CLI",
    long_about = "Operate the Leadline lead-qualification service: migrations, readiness checks, config inspection, offline extraction and lead export.",
    after_help = "Examples:\n  leadline doctor --json\n  leadline extract \"Villa in JVC, budget 2M\"\n  leadline export --min-score 70 --output leads.csv"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM settings, and DB connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run field extraction and scoring on a message without touching storage")]
    Extract {
        #[arg(help = "Message text as a lead would send it")]
        text: String,
    },
    #[command(about = "Write qualified leads as CSV")]
    Export {
        #[arg(long, default_value_t = 1, help = "Only include leads scoring at least this much")]
        min_score: u8,
        #[arg(long, help = "Write to this file instead of stdout")]
        output: Option<PathBuf>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Extract { text } => commands::extract::run(&text),
        Command::Export { min_score, output } => {
            commands::export::run(min_score, output.as_deref())
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
