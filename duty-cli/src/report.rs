//! Text and JSON rendering of calculation results.

use clap::ValueEnum;
use duty_core::{
    CalculationResult, DutySchedule, JurisdictionRules, Origin, RuleTable, TradePreference,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use crate::app::BatchLine;
use crate::utils::{format_percent, format_usd};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table with currency formatting
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    component: &'static str,
    #[tabled(rename = "Amount")]
    amount: String,
}

#[derive(Tabled)]
struct BatchRow {
    #[tabled(rename = "#")]
    row: usize,
    #[tabled(rename = "Jurisdiction")]
    jurisdiction: String,
    #[tabled(rename = "Origin")]
    origin: String,
    #[tabled(rename = "CIF")]
    cif: String,
    #[tabled(rename = "Total tax")]
    total_tax: String,
    #[tabled(rename = "Landed cost")]
    landed_cost: String,
    #[tabled(rename = "Effective")]
    effective: String,
    #[tabled(rename = "Savings")]
    savings: String,
    #[tabled(rename = "Error")]
    error: String,
}

#[derive(Tabled)]
struct JurisdictionRow {
    #[tabled(rename = "Code")]
    code: &'static str,
    #[tabled(rename = "Name")]
    name: &'static str,
    #[tabled(rename = "Duty")]
    duty: String,
    #[tabled(rename = "Sales tax")]
    sales_tax: String,
    #[tabled(rename = "US-built vehicles")]
    preference: String,
}

#[derive(Serialize)]
struct Classification<'a> {
    vin: &'a str,
    origin: Origin,
}

fn percent_of(rate: Decimal) -> String {
    format_percent(rate * Decimal::ONE_HUNDRED)
}

/// Renders one quote.
pub fn render_quote(
    result: &CalculationResult,
    format: OutputFormat,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(result);
    }

    let mut rows = vec![
        ComponentRow {
            component: "CIF value",
            amount: format_usd(result.cif_value),
        },
        ComponentRow {
            component: "Import duty",
            amount: format_usd(result.duty),
        },
        ComponentRow {
            component: "Consumption tax",
            amount: format_usd(result.consumption_tax),
        },
        ComponentRow {
            component: "Age tax",
            amount: format_usd(result.age_tax),
        },
        ComponentRow {
            component: "Sales tax",
            amount: format_usd(result.sales_tax),
        },
        ComponentRow {
            component: "Environmental fee",
            amount: format_usd(result.environmental_fee),
        },
        ComponentRow {
            component: "Registration fee",
            amount: format_usd(result.registration_fee),
        },
        ComponentRow {
            component: "Other fees",
            amount: format_usd(result.other_fees),
        },
        ComponentRow {
            component: "Total tax",
            amount: format_usd(result.total_tax),
        },
        ComponentRow {
            component: "Landed cost",
            amount: format_usd(result.landed_cost),
        },
        ComponentRow {
            component: "Effective tax rate",
            amount: format_percent(result.effective_tax_percentage),
        },
    ];
    if result.trade_preference_eligible {
        rows.push(ComponentRow {
            component: "CAFTA-DR savings",
            amount: format_usd(result.estimated_savings),
        });
    }

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();

    Ok(format!(
        "{} ({}), origin: {}\n{}",
        result.jurisdiction,
        result.jurisdiction.code(),
        result.origin.label(),
        table
    ))
}

/// Renders a batch run, one row per vehicle with failures inline.
pub fn render_batch(
    lines: &[BatchLine],
    format: OutputFormat,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        return serde_json::to_string_pretty(lines);
    }

    let rows: Vec<BatchRow> = lines
        .iter()
        .map(|line| match (&line.result, &line.error) {
            (Some(result), _) => BatchRow {
                row: line.row,
                jurisdiction: result.jurisdiction.name().to_string(),
                origin: result.origin.label().to_string(),
                cif: format_usd(result.cif_value),
                total_tax: format_usd(result.total_tax),
                landed_cost: format_usd(result.landed_cost),
                effective: format_percent(result.effective_tax_percentage),
                savings: format_usd(result.estimated_savings),
                error: String::new(),
            },
            (None, error) => BatchRow {
                row: line.row,
                jurisdiction: line.jurisdiction.clone(),
                origin: String::new(),
                cif: String::new(),
                total_tax: String::new(),
                landed_cost: String::new(),
                effective: String::new(),
                savings: String::new(),
                error: error.clone().unwrap_or_default(),
            },
        })
        .collect();

    let failed = lines.iter().filter(|line| line.result.is_none()).count();
    let landed: Decimal = lines
        .iter()
        .filter_map(|line| line.result.as_ref())
        .map(|result| result.landed_cost)
        .sum();

    let table = Table::new(rows).with(Style::rounded()).to_string();

    Ok(format!(
        "{}\n{} vehicles, {} failed, combined landed cost {}",
        table,
        lines.len(),
        failed,
        format_usd(landed)
    ))
}

fn describe_duty(entry: &JurisdictionRules) -> String {
    match &entry.rule.duty {
        Some(DutySchedule::Flat { rate }) => percent_of(*rate),
        Some(DutySchedule::ByEngineSize { tiers }) => {
            let rates: Vec<String> = tiers.iter().map(|t| percent_of(t.rate)).collect();
            format!("{} by engine size", rates.join(" / "))
        }
        None => "-".to_string(),
    }
}

fn describe_preference(preference: TradePreference) -> String {
    match preference {
        TradePreference::Waived => "duty waived".to_string(),
        TradePreference::Reduced { rate } => format!("duty at {}", percent_of(rate)),
        TradePreference::NotGranted => "no preference".to_string(),
    }
}

/// Renders the rule table overview.
pub fn render_jurisdictions(
    table: &RuleTable,
    format: OutputFormat,
) -> serde_json::Result<String> {
    if format == OutputFormat::Json {
        let entries: Vec<&JurisdictionRules> = table.entries().collect();
        return serde_json::to_string_pretty(&entries);
    }

    let rows: Vec<JurisdictionRow> = table
        .entries()
        .map(|entry| JurisdictionRow {
            code: entry.jurisdiction.code(),
            name: entry.jurisdiction.name(),
            duty: describe_duty(entry),
            sales_tax: entry
                .rule
                .sales_tax
                .as_ref()
                .map(|tax| percent_of(tax.rate))
                .unwrap_or_else(|| "-".to_string()),
            preference: describe_preference(entry.north_american),
        })
        .collect();

    Ok(Table::new(rows).with(Style::rounded()).to_string())
}

/// Renders the origin classification of a VIN.
pub fn render_classification(
    vin: &str,
    origin: Origin,
    format: OutputFormat,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(&Classification { vin, origin }),
        OutputFormat::Table => Ok(format!("{}: {}", vin.trim(), origin.label())),
    }
}

#[cfg(test)]
mod tests {
    use duty_core::{DutyCalculator, DutyError};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::app::run_batch;
    use crate::csv_loader::BatchVehicle;

    fn honduras_quote() -> CalculationResult {
        let table = RuleTable::cafta_dr(TradePreference::NotGranted);
        DutyCalculator::new(&table)
            .calculate(&duty_core::CalculationInput {
                declared_value: dec!(10000),
                freight: None,
                insurance: None,
                engine_cc: None,
                vehicle_age_years: 2,
                jurisdiction: "HN".to_string(),
                vehicle_identifier: Some("1N6AD0ER4DN751317".to_string()),
            })
            .unwrap()
    }

    #[test]
    fn quote_table_shows_formatted_amounts() {
        let text = render_quote(&honduras_quote(), OutputFormat::Table).unwrap();

        assert!(text.starts_with("Honduras (HN), origin: North American"));
        assert!(text.contains("$11,800.00"));
        assert!(text.contains("$16,634.00"));
        assert!(text.contains("40.97%"));
        assert!(text.contains("CAFTA-DR savings"));
        assert!(text.contains("$1,770.00"));
    }

    #[test]
    fn quote_json_round_trips() {
        let result = honduras_quote();

        let json = render_quote(&result, OutputFormat::Json).unwrap();
        let parsed: CalculationResult = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, result);
    }

    #[test]
    fn quote_json_uses_snake_case_keys() {
        let json = render_quote(&honduras_quote(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["jurisdiction"], "honduras");
        let landed: Decimal = value["landed_cost"].as_str().unwrap().parse().unwrap();
        assert_eq!(landed, dec!(16634));
        assert_eq!(value["trade_preference_eligible"], true);
    }

    #[test]
    fn batch_reports_failures_inline() {
        let table = RuleTable::cafta_dr(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let good = BatchVehicle {
            row: 1,
            input: duty_core::CalculationInput {
                declared_value: dec!(10000),
                freight: None,
                insurance: None,
                engine_cc: None,
                vehicle_age_years: 2,
                jurisdiction: "HN".to_string(),
                vehicle_identifier: None,
            },
        };
        let mut bad = good.clone();
        bad.row = 2;
        bad.input.jurisdiction = "atlantis".to_string();

        let lines = run_batch(&calculator, &[good, bad]);
        let text = render_batch(&lines, OutputFormat::Table).unwrap();

        assert!(text.contains(&DutyError::UnknownJurisdiction("atlantis".to_string()).to_string()));
        assert!(text.contains("2 vehicles, 1 failed"));
    }

    #[test]
    fn batch_json_marks_error_rows() {
        let lines = vec![BatchLine {
            row: 4,
            jurisdiction: "atlantis".to_string(),
            result: None,
            error: Some("unknown jurisdiction 'atlantis'".to_string()),
        }];

        let json = render_batch(&lines, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["row"], 4);
        assert_eq!(value[0]["error"], "unknown jurisdiction 'atlantis'");
        assert!(value[0].get("result").is_none());
    }

    #[test]
    fn jurisdictions_table_describes_preferences() {
        let table = RuleTable::cafta_dr(TradePreference::Reduced { rate: dec!(0.005) });

        let text = render_jurisdictions(&table, OutputFormat::Table).unwrap();

        assert!(text.contains("Dominican Republic"));
        assert!(text.contains("duty at 0.50%"));
        assert!(text.contains("10.00% / 15.00% / 20.00% by engine size"));
    }

    #[test]
    fn classification_table_line() {
        let origin = duty_core::classify("JN6AD0ER4DN751317");

        let text = render_classification("JN6AD0ER4DN751317", origin, OutputFormat::Table).unwrap();

        assert_eq!(text, "JN6AD0ER4DN751317: Other");
    }
}
