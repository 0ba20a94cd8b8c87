use std::fs::File;

use anyhow::{Context, Result};
use duty_core::{CalculationResult, DutyCalculator, RuleTable};
use duty_data::{BracketLoader, RuleTableLoader, set_costa_rica_preference};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::csv_loader::BatchVehicle;

/// Outcome of one batch row. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchLine {
    pub row: usize,
    /// Jurisdiction key as written in the file.
    pub jurisdiction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CalculationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Builds the rule table the configuration asks for.
///
/// Starts from `[rules] file` or the built-in CAFTA-DR table, applies any
/// bracket overrides, then sets the configured Costa Rica preference so the
/// decision lives in one place regardless of where the rules came from.
pub fn build_rule_table(config: &AppConfig) -> Result<RuleTable> {
    let costa_rica = config.trade_preference.costa_rica;

    let mut table = match &config.rules.file {
        Some(path) => {
            debug!("loading rule table from {}", path.display());
            RuleTableLoader::load_from_file(path)
                .with_context(|| format!("Failed to load rule table: {}", path.display()))?
        }
        None => RuleTable::cafta_dr(costa_rica),
    };

    if let Some(path) = &config.rules.brackets {
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = BracketLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        let written = BracketLoader::apply(&mut table, &records)
            .with_context(|| format!("Failed to apply brackets from {}", path.display()))?;
        info!(brackets = written, "applied bracket overrides from {}", path.display());
    }

    set_costa_rica_preference(&mut table, costa_rica);
    table.validate().context("Rule table is invalid")?;

    Ok(table)
}

/// Prices every vehicle, keeping per-row failures instead of stopping.
pub fn run_batch(
    calculator: &DutyCalculator<'_>,
    vehicles: &[BatchVehicle],
) -> Vec<BatchLine> {
    vehicles
        .iter()
        .map(|vehicle| {
            let outcome = calculator.calculate(&vehicle.input);
            if let Err(err) = &outcome {
                warn!(row = vehicle.row, %err, "batch row failed");
            }
            let (result, error) = match outcome {
                Ok(result) => (Some(result), None),
                Err(err) => (None, Some(err.to_string())),
            };
            BatchLine {
                row: vehicle.row,
                jurisdiction: vehicle.input.jurisdiction.clone(),
                result,
                error,
            }
        })
        .collect()
}
