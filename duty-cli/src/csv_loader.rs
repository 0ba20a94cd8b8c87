//! CSV loader for batch quotes.
//!
//! ## CSV Format
//!
//! Column order does **not** matter (headers are matched by name). Header
//! names are case-sensitive.
//!
//! | Column           | Required | Type    | Notes                                        |
//! |------------------|----------|---------|----------------------------------------------|
//! | `jurisdiction`   | yes      | string  | Code or name: `HN`, `guatemala`, `El Salvador` |
//! | `declared_value` | yes      | decimal | USD; `$` and `,` are accepted                |
//! | `freight`        | no       | decimal | Empty uses the configured default            |
//! | `insurance`      | no       | decimal | Empty uses the configured default            |
//! | `engine_cc`      | no       | integer | Needed where duty is tiered by engine size   |
//! | `age_years`      | no*      | integer |                                              |
//! | `model_year`     | no*      | integer | Used when `age_years` is empty               |
//! | `vin`            | no       | string  | 17-character VIN for origin classification   |
//!
//! \* every row needs `age_years` or `model_year`.
//!
//! ### Example
//!
//! ```csv
//! jurisdiction,declared_value,freight,insurance,engine_cc,age_years,model_year,vin
//! HN,"$10,000",1500,300,,2,,1N6AD0ER4DN751317
//! GT,8000,,,2000,,2019,JN6AD0ER4DN751317
//! ```
//!
//! Jurisdiction keys are not checked here; an unknown key is reported for
//! its row when the batch is calculated.

use std::path::Path;

use chrono::NaiveDate;
use duty_core::{CalculationInput, vehicle_age_from_model_year};
use serde::Deserialize;

use crate::utils::{ParseDecimalError, parse_decimal, parse_optional_decimal};

// ---------------------------------------------------------------------------
// Serde-compatible row that mirrors the CSV layout exactly
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CsvRow {
    jurisdiction: String,
    declared_value: String,
    freight: Option<String>,
    insurance: Option<String>,
    engine_cc: Option<u32>,
    age_years: Option<u32>,
    model_year: Option<i32>,
    vin: Option<String>,
}

/// One vehicle from a batch file, tagged with its row for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchVehicle {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub input: CalculationInput,
}

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or converting CSV data.
#[derive(Debug, thiserror::Error)]
pub enum CsvLoadError {
    /// The file could not be read.
    #[error("could not read batch file: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying CSV deserialisation failed (bad structure, missing
    /// required column, type mismatch, etc.).
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// A monetary cell could not be read as an amount.
    #[error("bad {column} on row {row}: {source}")]
    InvalidAmount {
        column: &'static str,
        row: usize,
        #[source]
        source: ParseDecimalError,
    },

    /// Neither `age_years` nor `model_year` was given.
    #[error("row {row} needs age_years or model_year")]
    MissingAge { row: usize },
}

// ---------------------------------------------------------------------------
// Core loader
// ---------------------------------------------------------------------------

fn amount(
    value: Option<String>,
    column: &'static str,
    row: usize,
) -> Result<Option<rust_decimal::Decimal>, CsvLoadError> {
    match value {
        Some(text) => parse_optional_decimal(&text)
            .map_err(|source| CsvLoadError::InvalidAmount { column, row, source }),
        None => Ok(None),
    }
}

/// Convert a single CSV row into a [`BatchVehicle`].
///
/// `row_number` is 1-based (for error messages); `as_of` anchors model-year
/// ages.
fn convert_row(
    row: CsvRow,
    row_number: usize,
    as_of: NaiveDate,
) -> Result<BatchVehicle, CsvLoadError> {
    let declared_value =
        parse_decimal(&row.declared_value).map_err(|source| CsvLoadError::InvalidAmount {
            column: "declared_value",
            row: row_number,
            source,
        })?;

    let vehicle_age_years = match (row.age_years, row.model_year) {
        (Some(age), _) => age,
        (None, Some(model_year)) => vehicle_age_from_model_year(model_year, as_of),
        (None, None) => return Err(CsvLoadError::MissingAge { row: row_number }),
    };

    Ok(BatchVehicle {
        row: row_number,
        input: CalculationInput {
            declared_value,
            freight: amount(row.freight, "freight", row_number)?,
            insurance: amount(row.insurance, "insurance", row_number)?,
            engine_cc: row.engine_cc,
            vehicle_age_years,
            jurisdiction: row.jurisdiction,
            vehicle_identifier: row.vin.filter(|vin| !vin.is_empty()),
        },
    })
}

/// Parse CSV text and return the vehicles in file order.
///
/// # Errors
///
/// * [`CsvLoadError::Parse`] if the CSV is structurally invalid or a
///   required column is missing.
/// * [`CsvLoadError::InvalidAmount`] if a monetary cell is not a number.
/// * [`CsvLoadError::MissingAge`] if a row gives neither age nor model year.
pub fn load_from_str(
    input: &str,
    as_of: NaiveDate,
) -> Result<Vec<BatchVehicle>, CsvLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All) // tolerate whitespace around values
        .flexible(false) // strict column count
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| {
            let row = result?;
            convert_row(row, idx + 1, as_of)
        })
        .collect()
}

/// Convenience wrapper: read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(
    path: &Path,
    as_of: NaiveDate,
) -> Result<Vec<BatchVehicle>, CsvLoadError> {
    let contents = std::fs::read_to_string(path)?;
    load_from_str(&contents, as_of)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
