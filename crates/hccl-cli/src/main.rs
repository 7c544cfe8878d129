mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing::Level;

use commands::concentration::{ConcentrationArgs, TemplateArgs};
use commands::config::DefaultConfigArgs;
use commands::lendable::LendableArgs;
use commands::repo::RepoPositionArgs;

/// Haircut and concentration limit calculations
#[derive(Parser)]
#[command(
    name = "hccl",
    version,
    about = "Haircut and concentration limit calculations",
    long_about = "Resolves per-security concentration limits and haircuts from the HCCL \
                  upload with decimal precision, projects the results onto the HC / CONC \
                  report template, calculates securities lending capacity and prices the \
                  reverse repo bond position."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log to stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve concentration limits, haircuts and rationales
    ConcentrationLimit(ConcentrationArgs),
    /// Cell assignments for the HC / CONC report template
    TemplateCells(TemplateArgs),
    /// Calculate lendable limits per stock
    LendableLimit(LendableArgs),
    /// Attach today's fair price to the reverse repo position report
    RepoPosition(RepoPositionArgs),
    /// Print the default rule configuration
    DefaultConfig(DefaultConfigArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::ConcentrationLimit(args) => commands::concentration::run_concentration_limit(args),
        Commands::TemplateCells(args) => commands::concentration::run_template_cells(args),
        Commands::LendableLimit(args) => commands::lendable::run_lendable_limit(args),
        Commands::RepoPosition(args) => commands::repo::run_repo_position(args),
        Commands::DefaultConfig(args) => commands::config::run_default_config(args),
        Commands::Version => {
            println!("hccl {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
