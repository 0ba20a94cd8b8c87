//! Import duty calculation for vehicles entering a CAFTA-DR jurisdiction.
//!
//! # Calculation Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | CIF = declared value + freight + insurance (blanks use [`CostDefaults`]) |
//! | 2    | Resolve the rule for (jurisdiction, origin class) |
//! | 3    | Duty: flat rate or engine-size tier × CIF, then the trade preference |
//! | 4    | Consumption tax: rate chosen by CIF bracket × configured base |
//! | 5    | Environmental fee (bracketed amount or % of CIF) |
//! | 6    | Registration fee (flat, % of CIF, or bracketed amount) |
//! | 7    | Age tax: age bracket rate × CIF |
//! | 8    | Miscellaneous fees: rate × CIF |
//! | 9    | Low-value flat fee, replacing or adding to the percentage fees |
//! | 10   | Sales tax: rate × configured base |
//! | 11   | Totals: total tax, landed cost, effective rate |
//!
//! The low-value adjustment is settled before the sales-tax base is built, so
//! an accumulated base only holds misc fees that are actually charged.
//!
//! Every component is rounded to cents as it is produced, so the landed cost
//! is exactly CIF plus the sum of the components. Amounts too large for
//! [`Decimal`] are reported as [`DutyError::InvalidInput`], never a panic.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use duty_core::calculations::DutyCalculator;
//! use duty_core::{CalculationInput, RuleTable, TradePreference};
//!
//! let table = RuleTable::cafta_dr(TradePreference::NotGranted);
//! let calculator = DutyCalculator::new(&table);
//!
//! let input = CalculationInput {
//!     declared_value: dec!(10000),
//!     freight: Some(dec!(1500)),
//!     insurance: Some(dec!(300)),
//!     engine_cc: None,
//!     vehicle_age_years: 2,
//!     jurisdiction: "honduras".to_string(),
//!     vehicle_identifier: Some("1N6AD0ER4DN751317".to_string()),
//! };
//!
//! let result = calculator.calculate(&input).unwrap();
//!
//! assert_eq!(result.cif_value, dec!(11800));
//! assert_eq!(result.duty, dec!(0));
//! assert_eq!(result.consumption_tax, dec!(2360));
//! assert_eq!(result.estimated_savings, dec!(1770));
//! assert_eq!(result.landed_cost, dec!(16634));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{
    checked_apply_rate, checked_sum, round_half_up, select_bracket,
};
use crate::calculations::origin::classify_optional;
use crate::models::{
    CalculationInput, CalculationResult, ConsumptionBase, CostDefaults, DutySchedule,
    EnvironmentalFee, Jurisdiction, LowValueMode, ParseJurisdictionError, RegistrationFee,
    SalesTaxBase, TaxRule, TradePreference,
};
use crate::rules::RuleTable;

/// Errors that can occur during a duty calculation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DutyError {
    /// A monetary input was out of range, or a required input was missing.
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    /// The jurisdiction key is not recognised or has no rule in the table.
    #[error("unknown jurisdiction '{0}'")]
    UnknownJurisdiction(String),
}

impl From<ParseJurisdictionError> for DutyError {
    fn from(err: ParseJurisdictionError) -> Self {
        DutyError::UnknownJurisdiction(err.0)
    }
}

fn too_large() -> DutyError {
    DutyError::InvalidInput {
        field: "declared_value",
        reason: "too large to price".to_string(),
    }
}

fn rate_of(
    base: Decimal,
    rate: Decimal,
) -> Result<Decimal, DutyError> {
    checked_apply_rate(base, rate).ok_or_else(too_large)
}

fn sum(amounts: &[Decimal]) -> Result<Decimal, DutyError> {
    checked_sum(amounts).ok_or_else(too_large)
}

/// Fees that a low-value flat fee may stand in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PercentageFees {
    environmental: Decimal,
    registration: Decimal,
    misc: Decimal,
}

/// Amounts that may make up a sales tax base.
#[derive(Debug, Clone, Copy)]
struct TaxableAmounts {
    cif: Decimal,
    duty: Decimal,
    consumption_tax: Decimal,
    age_tax: Decimal,
    misc_fees: Decimal,
}

/// Calculator for vehicle import duties.
///
/// Holds the rule table and the freight/insurance fallbacks. It keeps no
/// state between calls, so a single instance can be shared freely.
#[derive(Debug, Clone)]
pub struct DutyCalculator<'a> {
    rules: &'a RuleTable,
    defaults: CostDefaults,
}

impl<'a> DutyCalculator<'a> {
    /// Creates a calculator using [`CostDefaults::default`].
    pub fn new(rules: &'a RuleTable) -> Self {
        Self::with_defaults(rules, CostDefaults::default())
    }

    pub fn with_defaults(
        rules: &'a RuleTable,
        defaults: CostDefaults,
    ) -> Self {
        Self { rules, defaults }
    }

    pub fn defaults(&self) -> CostDefaults {
        self.defaults
    }

    /// Calculates the full duty breakdown for one vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`DutyError`] if:
    /// - the declared value is not positive, or freight/insurance is negative
    /// - the jurisdiction is unknown or missing from the table
    /// - the jurisdiction tiers duty by engine size and no engine size was given
    pub fn calculate(
        &self,
        input: &CalculationInput,
    ) -> Result<CalculationResult, DutyError> {
        let cif_value = self.cif_value(input)?;

        let jurisdiction: Jurisdiction = input.jurisdiction.parse()?;
        let origin = classify_optional(input.vehicle_identifier.as_deref());
        let resolved = self
            .rules
            .resolve(jurisdiction, origin.resolve())
            .ok_or_else(|| DutyError::UnknownJurisdiction(input.jurisdiction.clone()))?;
        let rule = resolved.rule;

        debug!(%jurisdiction, origin = origin.label(), %cif_value, "calculating import duties");

        let schedule_duty = self.schedule_duty(rule, jurisdiction, cif_value, input.engine_cc)?;
        let (duty, estimated_savings) =
            self.apply_preference(resolved.preference, cif_value, schedule_duty)?;

        let consumption_tax = self.consumption_tax(rule, cif_value, duty)?;
        let age_tax = self.age_tax(rule, cif_value, input.vehicle_age_years)?;

        let mut fees = PercentageFees {
            environmental: self.environmental_fee(rule, cif_value)?,
            registration: self.registration_fee(rule, cif_value)?,
            misc: self.misc_fees(rule, cif_value)?,
        };
        let low_value_fee = self.low_value_fee(rule, cif_value, &mut fees);

        let sales_tax = self.sales_tax(
            rule,
            TaxableAmounts {
                cif: cif_value,
                duty,
                consumption_tax,
                age_tax,
                misc_fees: fees.misc,
            },
        )?;

        let other_fees = sum(&[fees.misc, low_value_fee])?;
        let total_tax = sum(&[
            duty,
            consumption_tax,
            age_tax,
            sales_tax,
            fees.environmental,
            fees.registration,
            other_fees,
        ])?;
        let landed_cost = sum(&[cif_value, total_tax])?;
        let effective_tax_percentage = self.effective_percentage(total_tax, cif_value)?;

        debug!(%jurisdiction, %total_tax, %landed_cost, "import duties calculated");

        Ok(CalculationResult {
            jurisdiction,
            origin,
            cif_value,
            duty,
            consumption_tax,
            age_tax,
            sales_tax,
            environmental_fee: fees.environmental,
            registration_fee: fees.registration,
            other_fees,
            total_tax,
            landed_cost,
            effective_tax_percentage,
            trade_preference_eligible: resolved.preference.is_granted(),
            estimated_savings,
        })
    }

    /// Validates the monetary inputs and sums them into the CIF value.
    fn cif_value(
        &self,
        input: &CalculationInput,
    ) -> Result<Decimal, DutyError> {
        if input.declared_value <= Decimal::ZERO {
            return Err(DutyError::InvalidInput {
                field: "declared_value",
                reason: format!("must be greater than zero, got {}", input.declared_value),
            });
        }

        let freight = input.freight.unwrap_or(self.defaults.freight);
        if freight < Decimal::ZERO {
            return Err(DutyError::InvalidInput {
                field: "freight",
                reason: format!("must not be negative, got {freight}"),
            });
        }

        let insurance = input.insurance.unwrap_or(self.defaults.insurance);
        if insurance < Decimal::ZERO {
            return Err(DutyError::InvalidInput {
                field: "insurance",
                reason: format!("must not be negative, got {insurance}"),
            });
        }

        let cif = sum(&[input.declared_value, freight, insurance]).map(round_half_up)?;
        if cif.is_zero() {
            return Err(DutyError::InvalidInput {
                field: "declared_value",
                reason: format!("CIF value rounds to zero, got {}", input.declared_value),
            });
        }
        Ok(cif)
    }

    /// Duty before any trade preference.
    fn schedule_duty(
        &self,
        rule: &TaxRule,
        jurisdiction: Jurisdiction,
        cif: Decimal,
        engine_cc: Option<u32>,
    ) -> Result<Decimal, DutyError> {
        let rate = match &rule.duty {
            None => return Ok(Decimal::ZERO),
            Some(DutySchedule::Flat { rate }) => *rate,
            Some(DutySchedule::ByEngineSize { tiers }) => {
                let cc = engine_cc.ok_or_else(|| DutyError::InvalidInput {
                    field: "engine_cc",
                    reason: format!("{jurisdiction} tiers duty by engine size"),
                })?;
                select_bracket(tiers, Decimal::from(cc))
                    .map(|tier| tier.rate)
                    .unwrap_or_default()
            }
        };

        rate_of(cif, rate)
    }

    /// Returns `(charged duty, savings)` after the trade preference.
    fn apply_preference(
        &self,
        preference: TradePreference,
        cif: Decimal,
        schedule_duty: Decimal,
    ) -> Result<(Decimal, Decimal), DutyError> {
        let charged = match preference {
            TradePreference::NotGranted => schedule_duty,
            TradePreference::Waived => Decimal::ZERO,
            TradePreference::Reduced { rate } => rate_of(cif, rate)?.min(schedule_duty),
        };
        Ok((charged, schedule_duty - charged))
    }

    fn consumption_tax(
        &self,
        rule: &TaxRule,
        cif: Decimal,
        duty: Decimal,
    ) -> Result<Decimal, DutyError> {
        let Some(consumption) = &rule.consumption else {
            return Ok(Decimal::ZERO);
        };
        let Some(bracket) = select_bracket(&consumption.brackets, cif) else {
            return Ok(Decimal::ZERO);
        };

        let base = match consumption.base {
            ConsumptionBase::Cif => cif,
            ConsumptionBase::CifPlusDuty => sum(&[cif, duty])?,
        };
        rate_of(base, bracket.rate)
    }

    fn environmental_fee(
        &self,
        rule: &TaxRule,
        cif: Decimal,
    ) -> Result<Decimal, DutyError> {
        match &rule.environmental_fee {
            None => Ok(Decimal::ZERO),
            Some(EnvironmentalFee::Percentage { rate }) => rate_of(cif, *rate),
            Some(EnvironmentalFee::Bracketed { brackets }) => Ok(select_bracket(brackets, cif)
                .map(|b| round_half_up(b.amount))
                .unwrap_or_default()),
        }
    }

    fn registration_fee(
        &self,
        rule: &TaxRule,
        cif: Decimal,
    ) -> Result<Decimal, DutyError> {
        match &rule.registration_fee {
            None => Ok(Decimal::ZERO),
            Some(RegistrationFee::Flat { amount }) => Ok(round_half_up(*amount)),
            Some(RegistrationFee::Percentage { rate }) => rate_of(cif, *rate),
            Some(RegistrationFee::Bracketed { brackets }) => Ok(select_bracket(brackets, cif)
                .map(|b| round_half_up(b.amount))
                .unwrap_or_default()),
        }
    }

    /// Selects the first age bracket whose `max_age` covers the vehicle.
    fn age_tax(
        &self,
        rule: &TaxRule,
        cif: Decimal,
        age_years: u32,
    ) -> Result<Decimal, DutyError> {
        rule.age_brackets
            .iter()
            .find(|b| b.max_age.is_none_or(|max_age| age_years <= max_age))
            .map_or(Ok(Decimal::ZERO), |b| rate_of(cif, b.rate))
    }

    fn misc_fees(
        &self,
        rule: &TaxRule,
        cif: Decimal,
    ) -> Result<Decimal, DutyError> {
        rule.misc_fees_rate
            .map_or(Ok(Decimal::ZERO), |rate| rate_of(cif, rate))
    }

    /// Returns the low-value flat fee, if it applies. In replace mode the
    /// percentage-based fees in `fees` are zeroed.
    fn low_value_fee(
        &self,
        rule: &TaxRule,
        cif: Decimal,
        fees: &mut PercentageFees,
    ) -> Decimal {
        let Some(flat) = &rule.low_value_flat_fee else {
            return Decimal::ZERO;
        };
        if cif >= flat.threshold {
            return Decimal::ZERO;
        }

        if flat.mode == LowValueMode::Replace {
            if matches!(rule.environmental_fee, Some(EnvironmentalFee::Percentage { .. })) {
                fees.environmental = Decimal::ZERO;
            }
            if matches!(rule.registration_fee, Some(RegistrationFee::Percentage { .. })) {
                fees.registration = Decimal::ZERO;
            }
            fees.misc = Decimal::ZERO;
        }

        round_half_up(flat.amount)
    }

    fn sales_tax(
        &self,
        rule: &TaxRule,
        amounts: TaxableAmounts,
    ) -> Result<Decimal, DutyError> {
        let Some(sales_tax) = &rule.sales_tax else {
            return Ok(Decimal::ZERO);
        };

        let base = match sales_tax.base {
            SalesTaxBase::Cif => amounts.cif,
            SalesTaxBase::CifPlusDuty => sum(&[amounts.cif, amounts.duty])?,
            SalesTaxBase::CifPlusDutyAndConsumption => {
                sum(&[amounts.cif, amounts.duty, amounts.consumption_tax])?
            }
            SalesTaxBase::Accumulated => sum(&[
                amounts.cif,
                amounts.duty,
                amounts.consumption_tax,
                amounts.age_tax,
                amounts.misc_fees,
            ])?,
        };
        rate_of(base, sales_tax.rate)
    }

    /// Total tax as a percentage of CIF, rounded to two places.
    fn effective_percentage(
        &self,
        total_tax: Decimal,
        cif: Decimal,
    ) -> Result<Decimal, DutyError> {
        total_tax
            .checked_div(cif)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(round_half_up)
            .ok_or_else(too_large)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::common::apply_rate;
    use crate::models::{LowValueFlatFee, Origin, OriginClass, SalesTax};
    use crate::rules::JurisdictionRules;

    const US_VIN: &str = "1N6AD0ER4DN751317";
    const JAPAN_VIN: &str = "JN6AD0ER4DN751317";

    fn cafta(costa_rica: TradePreference) -> RuleTable {
        RuleTable::cafta_dr(costa_rica)
    }

    fn test_input(
        jurisdiction: &str,
        vin: Option<&str>,
    ) -> CalculationInput {
        CalculationInput {
            declared_value: dec!(10000),
            freight: Some(dec!(1500)),
            insurance: Some(dec!(300)),
            engine_cc: None,
            vehicle_age_years: 2,
            jurisdiction: jurisdiction.to_string(),
            vehicle_identifier: vin.map(str::to_string),
        }
    }

    // =========================================================================
    // cif_value tests
    // =========================================================================

    #[test]
    fn cif_value_sums_value_freight_and_insurance() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.cif_value(&test_input("HN", None));

        assert_eq!(result, Ok(dec!(11800)));
    }

    #[test]
    fn cif_value_uses_defaults_for_missing_costs() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.freight = None;
        input.insurance = None;

        let result = calculator.cif_value(&input);

        assert_eq!(result, Ok(dec!(11800)));
    }

    #[test]
    fn cif_value_uses_configured_defaults() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::with_defaults(
            &table,
            CostDefaults {
                freight: dec!(2000),
                insurance: dec!(100),
            },
        );
        let mut input = test_input("HN", None);
        input.freight = None;
        input.insurance = None;

        let result = calculator.cif_value(&input);

        assert_eq!(result, Ok(dec!(12100)));
    }

    #[test]
    fn cif_value_accepts_zero_freight() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.freight = Some(dec!(0));

        let result = calculator.cif_value(&input);

        assert_eq!(result, Ok(dec!(10300)));
    }

    #[test]
    fn zero_declared_value_is_invalid_input() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.declared_value = dec!(0);

        let err = calculator.calculate(&input).unwrap_err();

        assert!(matches!(
            err,
            DutyError::InvalidInput {
                field: "declared_value",
                ..
            }
        ));
    }

    #[test]
    fn negative_declared_value_is_invalid_input() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.declared_value = dec!(-500);

        let err = calculator.calculate(&input).unwrap_err();

        assert!(matches!(
            err,
            DutyError::InvalidInput {
                field: "declared_value",
                ..
            }
        ));
    }

    #[test]
    fn negative_insurance_is_invalid_input() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.insurance = Some(dec!(-1));

        let err = calculator.calculate(&input).unwrap_err();

        assert!(matches!(
            err,
            DutyError::InvalidInput {
                field: "insurance",
                ..
            }
        ));
    }

    #[test]
    fn sub_cent_cif_value_is_invalid_input() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.declared_value = dec!(0.001);
        input.freight = Some(dec!(0));
        input.insurance = Some(dec!(0));

        let err = calculator.calculate(&input).unwrap_err();

        assert!(matches!(
            err,
            DutyError::InvalidInput {
                field: "declared_value",
                ..
            }
        ));
    }

    #[test]
    fn declared_value_at_decimal_max_is_too_large() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.declared_value = Decimal::MAX;

        let result = calculator.calculate(&input);

        assert_eq!(result, Err(too_large()));
    }

    #[test]
    fn component_overflow_is_too_large_not_a_panic() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        for jurisdiction in ["HN", "CR", "DO"] {
            let mut input = test_input(jurisdiction, None);
            input.declared_value = dec!(50000000000000000000000000000);

            let result = calculator.calculate(&input);

            assert_eq!(result, Err(too_large()), "{jurisdiction}");
        }
    }

    #[test]
    fn large_value_that_fits_is_priced() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.declared_value = dec!(20000000000000000000000000000);

        let result = calculator.calculate(&input).unwrap();

        assert_eq!(result.landed_cost, result.cif_value + result.total_tax);
    }

    // =========================================================================
    // jurisdiction resolution tests
    // =========================================================================

    #[test]
    fn unknown_jurisdiction_key_is_rejected() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("atlantis", None));

        assert_eq!(
            result,
            Err(DutyError::UnknownJurisdiction("atlantis".to_string()))
        );
    }

    #[test]
    fn jurisdiction_missing_from_table_is_unknown() {
        let mut table = RuleTable::new();
        table.insert(JurisdictionRules {
            jurisdiction: Jurisdiction::Honduras,
            north_american: TradePreference::Waived,
            rule: TaxRule::default(),
        });
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("Guatemala", None));

        assert_eq!(
            result,
            Err(DutyError::UnknownJurisdiction("Guatemala".to_string()))
        );
    }

    // =========================================================================
    // Honduras
    // =========================================================================

    #[test]
    fn honduras_north_american_waives_duty() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("honduras", Some(US_VIN))).unwrap();

        assert_eq!(result.origin, Origin::Classified(OriginClass::NorthAmerican));
        assert_eq!(result.cif_value, dec!(11800));
        assert_eq!(result.duty, dec!(0));
        // 20% bracket (10,000 <= CIF < 20,000) on CIF + waived duty
        assert_eq!(result.consumption_tax, dec!(2360));
        // 15% of 11,800 + 0 + 2,360 = 14,160
        assert_eq!(result.sales_tax, dec!(2124));
        assert_eq!(result.environmental_fee, dec!(200));
        assert_eq!(result.registration_fee, dec!(150));
        assert_eq!(result.other_fees, dec!(0));
        assert_eq!(result.total_tax, dec!(4834));
        assert_eq!(result.landed_cost, dec!(16634));
        assert_eq!(result.effective_tax_percentage, dec!(40.97));
        assert!(result.trade_preference_eligible);
        // 15% of 11,800
        assert_eq!(result.estimated_savings, dec!(1770));
    }

    #[test]
    fn honduras_other_origin_pays_duty() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("honduras", Some(JAPAN_VIN))).unwrap();

        assert_eq!(result.duty, dec!(1770));
        // 20% of 11,800 + 1,770 = 13,570
        assert_eq!(result.consumption_tax, dec!(2714));
        // 15% of 11,800 + 1,770 + 2,714 = 16,284
        assert_eq!(result.sales_tax, dec!(2442.60));
        assert_eq!(result.total_tax, dec!(7276.60));
        assert_eq!(result.landed_cost, dec!(19076.60));
        assert!(!result.trade_preference_eligible);
        assert_eq!(result.estimated_savings, dec!(0));
    }

    #[test]
    fn indeterminate_origin_is_treated_as_other() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let indeterminate = calculator.calculate(&test_input("HN", Some("short"))).unwrap();
        let other = calculator.calculate(&test_input("HN", Some(JAPAN_VIN))).unwrap();

        assert_eq!(indeterminate.origin, Origin::Indeterminate);
        assert_eq!(indeterminate.duty, other.duty);
        assert_eq!(indeterminate.total_tax, other.total_tax);
        assert!(!indeterminate.trade_preference_eligible);
    }

    #[test]
    fn honduras_eco_fee_steps_up_with_value() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("HN", None);
        input.declared_value = dec!(13200); // CIF 15,000

        let result = calculator.calculate(&input).unwrap();

        assert_eq!(result.environmental_fee, dec!(280));
    }

    // =========================================================================
    // Guatemala
    // =========================================================================

    #[test]
    fn guatemala_duty_follows_engine_size() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("GT", Some(JAPAN_VIN));
        input.declared_value = dec!(8000);
        input.engine_cc = Some(2000);

        let result = calculator.calculate(&input).unwrap();

        assert_eq!(result.cif_value, dec!(9800));
        // 15% tier for 1,501-3,000 cc
        assert_eq!(result.duty, dec!(1470));
        // 12% of 9,800 + 1,470
        assert_eq!(result.sales_tax, dec!(1352.40));
        assert_eq!(result.registration_fee, dec!(100));
        assert_eq!(result.total_tax, dec!(2922.40));
        assert_eq!(result.landed_cost, dec!(12722.40));
    }

    #[test]
    fn guatemala_north_american_waiver_shrinks_sales_tax_base() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("GT", Some(US_VIN));
        input.declared_value = dec!(8000);
        input.engine_cc = Some(2000);

        let result = calculator.calculate(&input).unwrap();

        assert_eq!(result.duty, dec!(0));
        assert_eq!(result.sales_tax, dec!(1176));
        assert_eq!(result.total_tax, dec!(1276));
        assert_eq!(result.estimated_savings, dec!(1470));
    }

    #[test]
    fn guatemala_engine_tier_boundaries() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let rule = &table.get(Jurisdiction::Guatemala).unwrap().rule;

        let duty = |cc| {
            calculator
                .schedule_duty(rule, Jurisdiction::Guatemala, dec!(10000), Some(cc))
                .unwrap()
        };

        assert_eq!(duty(1500), dec!(1000));
        assert_eq!(duty(1501), dec!(1500));
        assert_eq!(duty(3000), dec!(1500));
        assert_eq!(duty(3001), dec!(2000));
    }

    #[test]
    fn guatemala_requires_engine_size() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let err = calculator.calculate(&test_input("GT", None)).unwrap_err();

        assert!(matches!(
            err,
            DutyError::InvalidInput {
                field: "engine_cc",
                ..
            }
        ));
    }

    // =========================================================================
    // El Salvador
    // =========================================================================

    #[test]
    fn el_salvador_low_value_flat_fee_replaces_percentage_fees() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("SV", Some(JAPAN_VIN));
        input.declared_value = dec!(2000);
        input.freight = Some(dec!(1000));
        input.insurance = Some(dec!(200));

        let result = calculator.calculate(&input).unwrap();

        assert_eq!(result.cif_value, dec!(3200));
        assert_eq!(result.duty, dec!(800));
        // 13% of 3,200 + 800
        assert_eq!(result.sales_tax, dec!(520));
        assert_eq!(result.environmental_fee, dec!(0));
        assert_eq!(result.registration_fee, dec!(0));
        assert_eq!(result.other_fees, dec!(300));
        assert_eq!(result.total_tax, dec!(1620));
        assert_eq!(result.landed_cost, dec!(4820));
    }

    #[test]
    fn el_salvador_threshold_is_exclusive() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("SV", None);
        input.declared_value = dec!(2500);
        input.freight = Some(dec!(1200));
        input.insurance = Some(dec!(300));

        let result = calculator.calculate(&input).unwrap();

        assert_eq!(result.cif_value, dec!(4000));
        assert_eq!(result.environmental_fee, dec!(40));
        assert_eq!(result.registration_fee, dec!(20));
        assert_eq!(result.other_fees, dec!(0));
    }

    #[test]
    fn el_salvador_regular_value_pays_percentage_fees() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("SV", None)).unwrap();

        assert_eq!(result.duty, dec!(2950));
        // 13% of 11,800 + 2,950
        assert_eq!(result.sales_tax, dec!(1917.50));
        assert_eq!(result.environmental_fee, dec!(118));
        assert_eq!(result.registration_fee, dec!(59));
        assert_eq!(result.total_tax, dec!(5044.50));
    }

    // =========================================================================
    // Nicaragua
    // =========================================================================

    #[test]
    fn nicaragua_consumption_tax_uses_cif_only() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("NI", None)).unwrap();

        assert_eq!(result.duty, dec!(1180));
        assert_eq!(result.consumption_tax, dec!(1180));
        // 1.5% customs services on CIF
        assert_eq!(result.other_fees, dec!(177));
        // 15% of 11,800 + 1,180 + 1,180
        assert_eq!(result.sales_tax, dec!(2124));
        assert_eq!(result.total_tax, dec!(4661));
        assert_eq!(result.landed_cost, dec!(16461));
    }

    #[test]
    fn nicaragua_waiver_leaves_consumption_tax_unchanged() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("NI", Some(US_VIN))).unwrap();

        assert_eq!(result.duty, dec!(0));
        assert_eq!(result.consumption_tax, dec!(1180));
        assert_eq!(result.sales_tax, dec!(1947));
        assert_eq!(result.total_tax, dec!(3304));
        assert_eq!(result.estimated_savings, dec!(1180));
    }

    // =========================================================================
    // Costa Rica
    // =========================================================================

    #[test]
    fn costa_rica_not_granted_charges_full_duty_to_us_vehicles() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("CR", Some(US_VIN))).unwrap();

        assert_eq!(result.duty, dec!(118));
        // 52.29% for vehicles up to 3 years old
        assert_eq!(result.age_tax, dec!(6170.22));
        assert_eq!(result.other_fees, dec!(118));
        // 13% of 11,800 + 118 + 6,170.22 + 118 = 18,206.22
        assert_eq!(result.sales_tax, dec!(2366.81));
        assert_eq!(result.total_tax, dec!(8773.03));
        assert_eq!(result.landed_cost, dec!(20573.03));
        assert!(!result.trade_preference_eligible);
        assert_eq!(result.estimated_savings, dec!(0));
    }

    #[test]
    fn costa_rica_waived_removes_duty_for_us_vehicles() {
        let table = cafta(TradePreference::Waived);
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("CR", Some(US_VIN))).unwrap();

        assert_eq!(result.duty, dec!(0));
        // 13% of 11,800 + 6,170.22 + 118 = 18,088.22
        assert_eq!(result.sales_tax, dec!(2351.47));
        assert_eq!(result.total_tax, dec!(8639.69));
        assert!(result.trade_preference_eligible);
        assert_eq!(result.estimated_savings, dec!(118));
    }

    #[test]
    fn costa_rica_reduced_rate_charges_partial_duty() {
        let table = cafta(TradePreference::Reduced { rate: dec!(0.005) });
        let calculator = DutyCalculator::new(&table);

        let result = calculator.calculate(&test_input("CR", Some(US_VIN))).unwrap();

        assert_eq!(result.duty, dec!(59));
        assert_eq!(result.sales_tax, dec!(2359.14));
        assert_eq!(result.total_tax, dec!(8706.36));
        assert!(result.trade_preference_eligible);
        assert_eq!(result.estimated_savings, dec!(59));
    }

    #[test]
    fn costa_rica_other_origin_ignores_preference_setting() {
        let waived = cafta(TradePreference::Waived);
        let not_granted = cafta(TradePreference::NotGranted);

        let a = DutyCalculator::new(&waived)
            .calculate(&test_input("CR", Some(JAPAN_VIN)))
            .unwrap();
        let b = DutyCalculator::new(&not_granted)
            .calculate(&test_input("CR", Some(JAPAN_VIN)))
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn costa_rica_age_buckets() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let rule = &table.get(Jurisdiction::CostaRica).unwrap().rule;

        assert_eq!(calculator.age_tax(rule, dec!(11800), 0), Ok(dec!(6170.22)));
        assert_eq!(calculator.age_tax(rule, dec!(11800), 3), Ok(dec!(6170.22)));
        assert_eq!(calculator.age_tax(rule, dec!(11800), 4), Ok(dec!(7541.38)));
        assert_eq!(calculator.age_tax(rule, dec!(11800), 5), Ok(dec!(7541.38)));
        assert_eq!(calculator.age_tax(rule, dec!(11800), 10), Ok(dec!(9325.54)));
    }

    // =========================================================================
    // Dominican Republic
    // =========================================================================

    #[test]
    fn dominican_republic_full_breakdown() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let mut input = test_input("dominican republic", None);
        input.declared_value = dec!(20000);

        let result = calculator.calculate(&input).unwrap();

        assert_eq!(result.cif_value, dec!(21800));
        assert_eq!(result.duty, dec!(4360));
        // 10% of 21,800 + 4,360
        assert_eq!(result.consumption_tax, dec!(2616));
        // 18% of 21,800 + 4,360 + 2,616
        assert_eq!(result.sales_tax, dec!(5179.68));
        assert_eq!(result.environmental_fee, dec!(654));
        assert_eq!(result.registration_fee, dec!(3706));
        assert_eq!(result.total_tax, dec!(16515.68));
        assert_eq!(result.landed_cost, dec!(38315.68));
    }

    // =========================================================================
    // low_value_fee tests
    // =========================================================================

    #[test]
    fn low_value_fee_additional_mode_keeps_percentage_fees() {
        let table = RuleTable::new();
        let calculator = DutyCalculator::new(&table);
        let rule = TaxRule {
            misc_fees_rate: Some(dec!(0.01)),
            low_value_flat_fee: Some(LowValueFlatFee {
                threshold: dec!(5000),
                amount: dec!(100),
                mode: LowValueMode::Additional,
            }),
            ..Default::default()
        };
        let mut fees = PercentageFees {
            environmental: dec!(0),
            registration: dec!(0),
            misc: dec!(30),
        };

        let flat = calculator.low_value_fee(&rule, dec!(3000), &mut fees);

        assert_eq!(flat, dec!(100));
        assert_eq!(fees.misc, dec!(30));
    }

    #[test]
    fn low_value_fee_replace_mode_keeps_flat_fees() {
        let table = RuleTable::new();
        let calculator = DutyCalculator::new(&table);
        let rule = TaxRule {
            registration_fee: Some(RegistrationFee::Flat { amount: dec!(150) }),
            low_value_flat_fee: Some(LowValueFlatFee {
                threshold: dec!(5000),
                amount: dec!(100),
                mode: LowValueMode::Replace,
            }),
            ..Default::default()
        };
        let mut fees = PercentageFees {
            environmental: dec!(0),
            registration: dec!(150),
            misc: dec!(0),
        };

        calculator.low_value_fee(&rule, dec!(3000), &mut fees);

        assert_eq!(fees.registration, dec!(150));
    }

    // =========================================================================
    // sales_tax tests
    // =========================================================================

    #[test]
    fn sales_tax_base_composition_is_per_rule() {
        let table = RuleTable::new();
        let calculator = DutyCalculator::new(&table);
        let amounts = TaxableAmounts {
            cif: dec!(1000),
            duty: dec!(100),
            consumption_tax: dec!(50),
            age_tax: dec!(20),
            misc_fees: dec!(10),
        };
        let rule_with = |base| TaxRule {
            sales_tax: Some(SalesTax {
                rate: dec!(0.10),
                base,
            }),
            ..Default::default()
        };

        assert_eq!(calculator.sales_tax(&rule_with(SalesTaxBase::Cif), amounts), Ok(dec!(100)));
        assert_eq!(
            calculator.sales_tax(&rule_with(SalesTaxBase::CifPlusDuty), amounts),
            Ok(dec!(110))
        );
        assert_eq!(
            calculator.sales_tax(&rule_with(SalesTaxBase::CifPlusDutyAndConsumption), amounts),
            Ok(dec!(115))
        );
        assert_eq!(
            calculator.sales_tax(&rule_with(SalesTaxBase::Accumulated), amounts),
            Ok(dec!(118))
        );
    }

    // =========================================================================
    // calculate (property) tests
    // =========================================================================

    #[test]
    fn landed_cost_is_cif_plus_total_tax() {
        let table = cafta(TradePreference::Waived);
        let calculator = DutyCalculator::new(&table);

        for jurisdiction in Jurisdiction::all() {
            for value in [dec!(950.55), dec!(3333.33), dec!(18765.43), dec!(123456.78)] {
                for vin in [Some(US_VIN), Some(JAPAN_VIN), None] {
                    let mut input = test_input(jurisdiction.code(), vin);
                    input.declared_value = value;
                    input.engine_cc = Some(2400);

                    let result = calculator.calculate(&input).unwrap();

                    assert_eq!(result.landed_cost, result.cif_value + result.total_tax);
                    assert_eq!(
                        result.total_tax,
                        result.duty
                            + result.consumption_tax
                            + result.age_tax
                            + result.sales_tax
                            + result.environmental_fee
                            + result.registration_fee
                            + result.other_fees
                    );
                }
            }
        }
    }

    #[test]
    fn waived_duty_savings_equal_cif_times_duty_rate() {
        let table = cafta(TradePreference::Waived);
        let calculator = DutyCalculator::new(&table);

        for entry in table.entries() {
            let Some(DutySchedule::Flat { rate }) = entry.rule.duty else {
                continue;
            };

            let result = calculator
                .calculate(&test_input(entry.jurisdiction.code(), Some(US_VIN)))
                .unwrap();

            assert_eq!(result.duty, dec!(0), "{}", entry.jurisdiction);
            assert_eq!(
                result.estimated_savings,
                apply_rate(result.cif_value, rate),
                "{}",
                entry.jurisdiction
            );
        }
    }

    #[test]
    fn calculate_is_idempotent() {
        let table = cafta(TradePreference::NotGranted);
        let calculator = DutyCalculator::new(&table);
        let input = test_input("CR", Some(US_VIN));

        let first = calculator.calculate(&input).unwrap();
        let second = calculator.calculate(&input).unwrap();

        assert_eq!(first, second);
    }
}
