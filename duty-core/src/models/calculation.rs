use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Jurisdiction, Origin};

/// Ocean freight assumed when the caller leaves freight blank.
pub const DEFAULT_FREIGHT_USD: Decimal = Decimal::from_parts(1500, 0, 0, false, 0);

/// Marine insurance assumed when the caller leaves insurance blank.
pub const DEFAULT_INSURANCE_USD: Decimal = Decimal::from_parts(300, 0, 0, false, 0);

/// Fallback freight and insurance used to complete a CIF value.
///
/// These are estimates for a US auction to Central American port shipment,
/// not statutory amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostDefaults {
    pub freight: Decimal,
    pub insurance: Decimal,
}

impl Default for CostDefaults {
    fn default() -> Self {
        Self {
            freight: DEFAULT_FREIGHT_USD,
            insurance: DEFAULT_INSURANCE_USD,
        }
    }
}

/// A single vehicle to price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationInput {
    /// Declared (purchase) value in USD. Must be positive.
    pub declared_value: Decimal,

    /// Freight to the destination port. `None` falls back to [`CostDefaults`].
    pub freight: Option<Decimal>,

    /// Insurance for the shipment. `None` falls back to [`CostDefaults`].
    pub insurance: Option<Decimal>,

    /// Engine displacement in cubic centimetres.
    /// Required only where duty is tiered by engine size.
    pub engine_cc: Option<u32>,

    /// Vehicle age in whole years (0 for the current model year).
    pub vehicle_age_years: u32,

    /// Destination jurisdiction key, either a country code or a name.
    pub jurisdiction: String,

    /// 17-character vehicle identification number, if known.
    pub vehicle_identifier: Option<String>,
}

/// Full breakdown of what importing one vehicle costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationResult {
    pub jurisdiction: Jurisdiction,
    pub origin: Origin,

    /// Declared value plus freight plus insurance.
    pub cif_value: Decimal,

    /// Import duty actually charged, after any trade preference.
    pub duty: Decimal,

    /// Selective consumption tax.
    pub consumption_tax: Decimal,

    /// Age-banded tax on CIF.
    pub age_tax: Decimal,

    pub sales_tax: Decimal,
    pub environmental_fee: Decimal,
    pub registration_fee: Decimal,

    /// Miscellaneous percentage fees and any low-value flat fee.
    pub other_fees: Decimal,

    /// Sum of every tax and fee above.
    pub total_tax: Decimal,

    /// `cif_value + total_tax`.
    pub landed_cost: Decimal,

    /// `total_tax / cif_value`, expressed in percent.
    pub effective_tax_percentage: Decimal,

    /// Whether a CAFTA-DR preference was applied to the duty.
    pub trade_preference_eligible: bool,

    /// Duty avoided thanks to the preference.
    pub estimated_savings: Decimal,
}

/// Derives a vehicle's age in whole years from its model year.
///
/// Model years ahead of `as_of` (next year's models are sold early) count
/// as age zero.
///
/// ```
/// use chrono::NaiveDate;
/// use duty_core::vehicle_age_from_model_year;
///
/// let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
///
/// assert_eq!(vehicle_age_from_model_year(2019, today), 6);
/// assert_eq!(vehicle_age_from_model_year(2026, today), 0);
/// ```
pub fn vehicle_age_from_model_year(
    model_year: i32,
    as_of: NaiveDate,
) -> u32 {
    u32::try_from(as_of.year() - model_year).unwrap_or(0)
}
