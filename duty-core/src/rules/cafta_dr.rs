//! Built-in CAFTA-DR rule table.
//!
//! All amounts are USD. Percentage fees (environmental, registration, misc
//! and age tax) are levied on CIF.
//!
//! | | Duty | Consumption | Sales tax | Other |
//! |---|---|---|---|---|
//! | Honduras | 15% | 10–60% by CIF, on CIF + duty | 15% on CIF + duty + consumption | eco fee $200–$400, registration $150 |
//! | Guatemala | 10/15/20% by engine size | – | 12% on CIF + duty | registration $100–$500 by CIF |
//! | El Salvador | 25% | – | 13% on CIF + duty | 1% environmental, 0.5% registration, $300 flat below $4,000 CIF |
//! | Nicaragua | 10% | 10–30% by CIF, on CIF | 15% on CIF + duty + consumption | 1.5% customs services |
//! | Costa Rica | 1% | – | 13% on everything accumulated | 52.29/63.91/79.03% by age, 1% Ley 6946 |
//! | Dominican Republic | 20% | 10–30% by CIF, on CIF + duty | 18% on CIF + duty + consumption | 3% CO2, 17% first registration |
//!
//! Costa Rica's treatment of US-built vehicles is not settled in the rate
//! sources, so the caller must choose it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{JurisdictionRules, RuleTable};
use crate::models::{
    AgeBracket, ConsumptionBase, ConsumptionTax, DutySchedule, EngineSizeTier, EnvironmentalFee,
    FeeBracket, Jurisdiction, LowValueFlatFee, LowValueMode, RateBracket, RegistrationFee,
    SalesTax, SalesTaxBase, TaxRule, TradePreference,
};

impl RuleTable {
    /// Builds the shipped CAFTA-DR table.
    ///
    /// `costa_rica` decides how North American vehicles are treated in Costa
    /// Rica; every other member waives the duty.
    ///
    /// # Example
    ///
    /// ```
    /// use duty_core::{Jurisdiction, RuleTable, TradePreference};
    ///
    /// let table = RuleTable::cafta_dr(TradePreference::NotGranted);
    ///
    /// assert_eq!(table.len(), 6);
    /// assert!(table.validate().is_ok());
    /// assert_eq!(
    ///     table.get(Jurisdiction::CostaRica).unwrap().north_american,
    ///     TradePreference::NotGranted
    /// );
    /// ```
    pub fn cafta_dr(costa_rica: TradePreference) -> Self {
        let mut table = RuleTable::new();
        table.insert(honduras());
        table.insert(guatemala());
        table.insert(el_salvador());
        table.insert(nicaragua());
        table.insert(costa_rica_rules(costa_rica));
        table.insert(dominican_republic());
        table
    }
}

fn rate_brackets(steps: &[(Decimal, Decimal)]) -> Vec<RateBracket> {
    steps
        .iter()
        .map(|&(lower_bound, rate)| RateBracket { lower_bound, rate })
        .collect()
}

fn fee_brackets(steps: &[(Decimal, Decimal)]) -> Vec<FeeBracket> {
    steps
        .iter()
        .map(|&(lower_bound, amount)| FeeBracket {
            lower_bound,
            amount,
        })
        .collect()
}

fn honduras() -> JurisdictionRules {
    JurisdictionRules {
        jurisdiction: Jurisdiction::Honduras,
        north_american: TradePreference::Waived,
        rule: TaxRule {
            duty: Some(DutySchedule::Flat { rate: dec!(0.15) }),
            consumption: Some(ConsumptionTax {
                base: ConsumptionBase::CifPlusDuty,
                brackets: rate_brackets(&[
                    (dec!(0), dec!(0.10)),
                    (dec!(7000), dec!(0.15)),
                    (dec!(10000), dec!(0.20)),
                    (dec!(20000), dec!(0.30)),
                    (dec!(50000), dec!(0.45)),
                    (dec!(100000), dec!(0.60)),
                ]),
            }),
            sales_tax: Some(SalesTax {
                rate: dec!(0.15),
                base: SalesTaxBase::CifPlusDutyAndConsumption,
            }),
            environmental_fee: Some(EnvironmentalFee::Bracketed {
                brackets: fee_brackets(&[
                    (dec!(0), dec!(200)),
                    (dec!(15000), dec!(280)),
                    (dec!(25000), dec!(400)),
                ]),
            }),
            registration_fee: Some(RegistrationFee::Flat { amount: dec!(150) }),
            ..Default::default()
        },
    }
}

fn guatemala() -> JurisdictionRules {
    JurisdictionRules {
        jurisdiction: Jurisdiction::Guatemala,
        north_american: TradePreference::Waived,
        rule: TaxRule {
            duty: Some(DutySchedule::ByEngineSize {
                tiers: vec![
                    EngineSizeTier {
                        min_cc: 0,
                        rate: dec!(0.10),
                    },
                    EngineSizeTier {
                        min_cc: 1501,
                        rate: dec!(0.15),
                    },
                    EngineSizeTier {
                        min_cc: 3001,
                        rate: dec!(0.20),
                    },
                ],
            }),
            sales_tax: Some(SalesTax {
                rate: dec!(0.12),
                base: SalesTaxBase::CifPlusDuty,
            }),
            registration_fee: Some(RegistrationFee::Bracketed {
                brackets: fee_brackets(&[
                    (dec!(0), dec!(100)),
                    (dec!(10000), dec!(250)),
                    (dec!(30000), dec!(500)),
                ]),
            }),
            ..Default::default()
        },
    }
}

fn el_salvador() -> JurisdictionRules {
    JurisdictionRules {
        jurisdiction: Jurisdiction::ElSalvador,
        north_american: TradePreference::Waived,
        rule: TaxRule {
            duty: Some(DutySchedule::Flat { rate: dec!(0.25) }),
            sales_tax: Some(SalesTax {
                rate: dec!(0.13),
                base: SalesTaxBase::CifPlusDuty,
            }),
            environmental_fee: Some(EnvironmentalFee::Percentage { rate: dec!(0.01) }),
            registration_fee: Some(RegistrationFee::Percentage { rate: dec!(0.005) }),
            low_value_flat_fee: Some(LowValueFlatFee {
                threshold: dec!(4000),
                amount: dec!(300),
                mode: LowValueMode::Replace,
            }),
            ..Default::default()
        },
    }
}

fn nicaragua() -> JurisdictionRules {
    JurisdictionRules {
        jurisdiction: Jurisdiction::Nicaragua,
        north_american: TradePreference::Waived,
        rule: TaxRule {
            misc_fees_rate: Some(dec!(0.015)),
            duty: Some(DutySchedule::Flat { rate: dec!(0.10) }),
            consumption: Some(ConsumptionTax {
                base: ConsumptionBase::Cif,
                brackets: rate_brackets(&[
                    (dec!(0), dec!(0.10)),
                    (dec!(20000), dec!(0.15)),
                    (dec!(40000), dec!(0.30)),
                ]),
            }),
            sales_tax: Some(SalesTax {
                rate: dec!(0.15),
                base: SalesTaxBase::CifPlusDutyAndConsumption,
            }),
            ..Default::default()
        },
    }
}

fn costa_rica_rules(north_american: TradePreference) -> JurisdictionRules {
    JurisdictionRules {
        jurisdiction: Jurisdiction::CostaRica,
        north_american,
        rule: TaxRule {
            misc_fees_rate: Some(dec!(0.01)),
            duty: Some(DutySchedule::Flat { rate: dec!(0.01) }),
            sales_tax: Some(SalesTax {
                rate: dec!(0.13),
                base: SalesTaxBase::Accumulated,
            }),
            age_brackets: vec![
                AgeBracket {
                    max_age: Some(3),
                    rate: dec!(0.5229),
                    label: "new".to_string(),
                },
                AgeBracket {
                    max_age: Some(5),
                    rate: dec!(0.6391),
                    label: "recent".to_string(),
                },
                AgeBracket {
                    max_age: None,
                    rate: dec!(0.7903),
                    label: "older".to_string(),
                },
            ],
            ..Default::default()
        },
    }
}

fn dominican_republic() -> JurisdictionRules {
    JurisdictionRules {
        jurisdiction: Jurisdiction::DominicanRepublic,
        north_american: TradePreference::Waived,
        rule: TaxRule {
            duty: Some(DutySchedule::Flat { rate: dec!(0.20) }),
            consumption: Some(ConsumptionTax {
                base: ConsumptionBase::CifPlusDuty,
                brackets: rate_brackets(&[
                    (dec!(0), dec!(0.10)),
                    (dec!(25000), dec!(0.20)),
                    (dec!(50000), dec!(0.30)),
                ]),
            }),
            sales_tax: Some(SalesTax {
                rate: dec!(0.18),
                base: SalesTaxBase::CifPlusDutyAndConsumption,
            }),
            environmental_fee: Some(EnvironmentalFee::Percentage { rate: dec!(0.03) }),
            registration_fee: Some(RegistrationFee::Percentage { rate: dec!(0.17) }),
            ..Default::default()
        },
    }
}
