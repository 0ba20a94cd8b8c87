use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use duty_core::{CalculationInput, DutyCalculator, classify, vehicle_age_from_model_year};
use rust_decimal::Decimal;
use tracing::debug;

use duty_cli::app::{build_rule_table, run_batch};
use duty_cli::config::AppConfig;
use duty_cli::report::{self, OutputFormat};
use duty_cli::utils::parse_decimal;
use duty_cli::{csv_loader, logging};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Import duty calculator for vehicles shipped to CAFTA-DR countries.
///
/// Estimates duty, consumption and sales taxes, fees and the landed cost
/// for Honduras, Guatemala, El Salvador, Nicaragua, Costa Rica and the
/// Dominican Republic.
#[derive(Debug, Parser)]
#[command(name = "duty-calc", version)]
struct Cli {
    /// Configuration file (defaults to the built-in configuration).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive; overrides the configuration.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Append logs to this file; overrides the configuration.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Price a single vehicle.
    Quote(QuoteArgs),

    /// Price every vehicle in a CSV file.
    Batch {
        /// CSV file, see the csv_loader docs for columns.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show the trade-preference origin class of a VIN.
    Classify {
        /// 17-character vehicle identification number.
        vin: String,
    },

    /// List the jurisdictions and their headline rates.
    Jurisdictions,
}

#[derive(Debug, Args)]
struct QuoteArgs {
    /// Destination: code (HN) or name ("el salvador").
    #[arg(short, long)]
    jurisdiction: String,

    /// Declared value in USD, e.g. 12500 or "$12,500".
    #[arg(short, long, value_parser = parse_decimal)]
    value: Decimal,

    /// Freight in USD (defaults to the configured amount).
    #[arg(long, value_parser = parse_decimal)]
    freight: Option<Decimal>,

    /// Insurance in USD (defaults to the configured amount).
    #[arg(long, value_parser = parse_decimal)]
    insurance: Option<Decimal>,

    /// Engine displacement in cc (needed for Guatemala).
    #[arg(long)]
    engine_cc: Option<u32>,

    /// Vehicle age in years.
    #[arg(long, required_unless_present = "model_year", conflicts_with = "model_year")]
    age: Option<u32>,

    /// Model year; the age is derived from today's date.
    #[arg(long)]
    model_year: Option<i32>,

    /// Vehicle identification number, used to classify origin.
    #[arg(long)]
    vin: Option<String>,
}

impl QuoteArgs {
    fn into_input(self) -> CalculationInput {
        let vehicle_age_years = match (self.age, self.model_year) {
            (Some(age), _) => age,
            (None, Some(model_year)) => {
                vehicle_age_from_model_year(model_year, Local::now().date_naive())
            }
            (None, None) => 0,
        };

        CalculationInput {
            declared_value: self.value,
            freight: self.freight,
            insurance: self.insurance,
            engine_cc: self.engine_cc,
            vehicle_age_years,
            jurisdiction: self.jurisdiction,
            vehicle_identifier: self.vin,
        }
    }
}

// ─── entry point ─────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let level = cli.log_level.as_deref().unwrap_or(config.logging.level.as_str());
    let log_file = cli.log_file.as_deref().or(config.logging.file.as_deref());
    logging::init(level, log_file)?;

    debug!(?config, "configuration loaded");

    let table = build_rule_table(&config)?;
    let calculator = DutyCalculator::with_defaults(&table, config.defaults);

    let output = match cli.command {
        Command::Quote(args) => {
            let input = args.into_input();
            let result = calculator
                .calculate(&input)
                .with_context(|| format!("Cannot price vehicle for '{}'", input.jurisdiction))?;
            report::render_quote(&result, cli.format)?
        }
        Command::Batch { file } => {
            let vehicles = csv_loader::load_from_file(&file, Local::now().date_naive())
                .with_context(|| format!("Failed to load batch file: {}", file.display()))?;
            debug!(vehicles = vehicles.len(), "batch loaded");
            let lines = run_batch(&calculator, &vehicles);
            report::render_batch(&lines, cli.format)?
        }
        Command::Classify { vin } => report::render_classification(&vin, classify(&vin), cli.format)?,
        Command::Jurisdictions => report::render_jurisdictions(&table, cli.format)?,
    };

    println!("{output}");

    Ok(())
}
