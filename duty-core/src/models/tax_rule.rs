use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calculations::common::Bracket;

/// Errors reported by [`TaxRule::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// A bracket table was declared but holds no entries.
    #[error("{table} table is empty")]
    EmptyTable { table: &'static str },

    /// Bracket lower bounds must be strictly ascending.
    #[error("{table} table is not strictly ascending at {bound}")]
    UnorderedTable { table: &'static str, bound: Decimal },

    /// Rates are fractions between 0 and 1.
    #[error("{field} must be between 0 and 1, got {value}")]
    RateOutOfRange { field: &'static str, value: Decimal },

    /// Fees and thresholds cannot be negative.
    #[error("{field} must be non-negative, got {value}")]
    NegativeAmount { field: &'static str, value: Decimal },

    /// Only the last age bracket may omit `max_age`.
    #[error("only the last age bracket may be unbounded")]
    UnboundedAgeBracket,
}

/// One step of a value-banded rate table.
///
/// The rate applies to values at or above `lower_bound` and below the next
/// bracket's lower bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBracket {
    pub lower_bound: Decimal,
    pub rate: Decimal,
}

/// One step of a value-banded flat fee table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBracket {
    pub lower_bound: Decimal,
    pub amount: Decimal,
}

/// Duty rate for engines of at least `min_cc` cubic centimetres.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSizeTier {
    pub min_cc: u32,
    pub rate: Decimal,
}

impl Bracket for RateBracket {
    fn lower_bound(&self) -> Decimal {
        self.lower_bound
    }
}

impl Bracket for FeeBracket {
    fn lower_bound(&self) -> Decimal {
        self.lower_bound
    }
}

impl Bracket for EngineSizeTier {
    fn lower_bound(&self) -> Decimal {
        Decimal::from(self.min_cc)
    }
}

/// Import duty (DAI) schedule. A rule carries a flat rate or engine tiers,
/// never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DutySchedule {
    Flat { rate: Decimal },
    ByEngineSize { tiers: Vec<EngineSizeTier> },
}

/// What the selective consumption tax is levied on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionBase {
    Cif,
    CifPlusDuty,
}

/// Selective consumption tax. The bracket is chosen by CIF value; the rate
/// is then applied to `base`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionTax {
    pub base: ConsumptionBase,
    pub brackets: Vec<RateBracket>,
}

/// What the sales tax (IVA / ISV / ITBIS) is levied on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesTaxBase {
    Cif,
    CifPlusDuty,
    CifPlusDutyAndConsumption,
    /// CIF plus duty, consumption tax, age tax and miscellaneous fees.
    Accumulated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesTax {
    pub rate: Decimal,
    pub base: SalesTaxBase,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvironmentalFee {
    Bracketed { brackets: Vec<FeeBracket> },
    Percentage { rate: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegistrationFee {
    Flat { amount: Decimal },
    Percentage { rate: Decimal },
    Bracketed { brackets: Vec<FeeBracket> },
}

/// Age-banded tax on CIF. Brackets are ordered by `max_age`; `None` marks
/// the open-ended last bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBracket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
    pub rate: Decimal,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowValueMode {
    /// The flat fee stands in for every percentage-based fee.
    Replace,
    /// The flat fee is charged on top of everything else.
    Additional,
}

/// Flat fee for vehicles whose CIF value is below `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowValueFlatFee {
    pub threshold: Decimal,
    pub amount: Decimal,
    pub mode: LowValueMode,
}

/// Treatment of North American origin vehicles under CAFTA-DR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TradePreference {
    /// Import duty is fully waived.
    Waived,
    /// Import duty is charged at `rate` instead of the schedule rate.
    Reduced { rate: Decimal },
    /// No preference; the normal duty applies.
    NotGranted,
}

impl TradePreference {
    pub fn is_granted(&self) -> bool {
        !matches!(self, TradePreference::NotGranted)
    }
}

/// Every tax and fee a jurisdiction levies on an imported vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misc_fees_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duty: Option<DutySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumption: Option<ConsumptionTax>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sales_tax: Option<SalesTax>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environmental_fee: Option<EnvironmentalFee>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_fee: Option<RegistrationFee>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub age_brackets: Vec<AgeBracket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_value_flat_fee: Option<LowValueFlatFee>,
}

impl TaxRule {
    /// Checks bracket ordering and rate ranges.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] found.
    pub fn validate(&self) -> Result<(), RuleError> {
        if let Some(rate) = self.misc_fees_rate {
            check_rate("misc_fees_rate", rate)?;
        }

        match &self.duty {
            Some(DutySchedule::Flat { rate }) => check_rate("duty rate", *rate)?,
            Some(DutySchedule::ByEngineSize { tiers }) => {
                check_ascending("engine size", tiers)?;
                for tier in tiers {
                    check_rate("engine size duty rate", tier.rate)?;
                }
            }
            None => {}
        }

        if let Some(consumption) = &self.consumption {
            check_ascending("consumption", &consumption.brackets)?;
            for bracket in &consumption.brackets {
                check_rate("consumption rate", bracket.rate)?;
            }
        }

        if let Some(sales_tax) = &self.sales_tax {
            check_rate("sales tax rate", sales_tax.rate)?;
        }

        match &self.environmental_fee {
            Some(EnvironmentalFee::Bracketed { brackets }) => {
                check_fee_table("environmental fee", brackets)?
            }
            Some(EnvironmentalFee::Percentage { rate }) => {
                check_rate("environmental fee rate", *rate)?
            }
            None => {}
        }

        match &self.registration_fee {
            Some(RegistrationFee::Flat { amount }) => {
                check_amount("registration fee", *amount)?
            }
            Some(RegistrationFee::Percentage { rate }) => {
                check_rate("registration fee rate", *rate)?
            }
            Some(RegistrationFee::Bracketed { brackets }) => {
                check_fee_table("registration fee", brackets)?
            }
            None => {}
        }

        self.validate_age_brackets()?;

        if let Some(fee) = &self.low_value_flat_fee {
            check_amount("low value threshold", fee.threshold)?;
            check_amount("low value fee", fee.amount)?;
        }

        Ok(())
    }

    fn validate_age_brackets(&self) -> Result<(), RuleError> {
        let mut previous: Option<u32> = None;
        let last = self.age_brackets.len().saturating_sub(1);

        for (idx, bracket) in self.age_brackets.iter().enumerate() {
            check_rate("age tax rate", bracket.rate)?;
            match bracket.max_age {
                None if idx != last => return Err(RuleError::UnboundedAgeBracket),
                None => {}
                Some(max_age) => {
                    if previous.is_some_and(|p| max_age <= p) {
                        return Err(RuleError::UnorderedTable {
                            table: "age",
                            bound: Decimal::from(max_age),
                        });
                    }
                    previous = Some(max_age);
                }
            }
        }

        Ok(())
    }
}

fn check_rate(
    field: &'static str,
    value: Decimal,
) -> Result<(), RuleError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(RuleError::RateOutOfRange { field, value });
    }
    Ok(())
}

fn check_amount(
    field: &'static str,
    value: Decimal,
) -> Result<(), RuleError> {
    if value < Decimal::ZERO {
        return Err(RuleError::NegativeAmount { field, value });
    }
    Ok(())
}

fn check_ascending<B: Bracket>(
    table: &'static str,
    brackets: &[B],
) -> Result<(), RuleError> {
    if brackets.is_empty() {
        return Err(RuleError::EmptyTable { table });
    }
    for pair in brackets.windows(2) {
        if pair[1].lower_bound() <= pair[0].lower_bound() {
            return Err(RuleError::UnorderedTable {
                table,
                bound: pair[1].lower_bound(),
            });
        }
    }
    Ok(())
}

fn check_fee_table(
    table: &'static str,
    brackets: &[FeeBracket],
) -> Result<(), RuleError> {
    check_ascending(table, brackets)?;
    for bracket in brackets {
        check_amount(table, bracket.amount)?;
    }
    Ok(())
}
