use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use duty_core::{RuleTable, TradePreference};
use duty_data::{
    BracketLoader, RuleTableLoader, parse_trade_preference, set_costa_rica_preference,
};

/// Build a duty rule table and write it out as TOML.
///
/// Starts from a TOML rule file, or from the built-in CAFTA-DR table when no
/// file is given, then applies bracket overrides from a CSV file with the
/// columns:
/// - jurisdiction: code or name (HN, guatemala, "el salvador")
/// - table: consumption, environmental or registration
/// - lower_bound: CIF value (USD) where the bracket starts
/// - value: rate for consumption, USD amount for fees
#[derive(Parser, Debug)]
#[command(name = "duty-rules")]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML rule file to start from (defaults to the built-in table)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Costa Rica treatment of US-built vehicles: "waived", "not-granted", or a
    /// reduced duty rate such as 0.005. Replaces the entry from --file too.
    #[arg(long, default_value = "not-granted", value_parser = parse_trade_preference)]
    costa_rica: TradePreference,

    /// CSV file of bracket overrides to apply
    #[arg(short, long)]
    brackets: Option<PathBuf>,

    /// Write the resulting table to this TOML file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut table = match &args.file {
        Some(path) => {
            println!("Loading rule table from: {}", path.display());
            RuleTableLoader::load_from_file(path)
                .with_context(|| format!("Failed to load rule table: {}", path.display()))?
        }
        None => {
            println!("Starting from the built-in CAFTA-DR table.");
            RuleTable::cafta_dr(args.costa_rica)
        }
    };

    if set_costa_rica_preference(&mut table, args.costa_rica) {
        println!("Costa Rica preference set to {:?}", args.costa_rica);
    }

    if let Some(path) = &args.brackets {
        println!("Applying brackets from: {}", path.display());

        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = BracketLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;

        println!("Parsed {} records from CSV", records.len());

        let written = BracketLoader::apply(&mut table, &records)
            .context("Failed to apply bracket overrides")?;

        println!("Replaced {} brackets.", written);
    }

    for entry in table.entries() {
        println!(
            "  {:<20} north american: {:?}",
            entry.jurisdiction.name(),
            entry.north_american
        );
    }

    if let Some(path) = &args.output {
        let rendered = RuleTableLoader::to_toml(&table).context("Failed to render rule table")?;
        fs::write(path, rendered)
            .with_context(|| format!("Failed to write: {}", path.display()))?;
        println!("Wrote {} jurisdictions to {}", table.len(), path.display());
    }

    Ok(())
}
