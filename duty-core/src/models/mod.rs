mod calculation;
mod jurisdiction;
mod origin;
mod tax_rule;

pub use calculation::{
    CalculationInput, CalculationResult, CostDefaults, DEFAULT_FREIGHT_USD,
    DEFAULT_INSURANCE_USD, vehicle_age_from_model_year,
};
pub use jurisdiction::{Jurisdiction, ParseJurisdictionError};
pub use origin::{Origin, OriginClass};
pub use tax_rule::{
    AgeBracket, ConsumptionBase, ConsumptionTax, DutySchedule, EngineSizeTier,
    EnvironmentalFee, FeeBracket, LowValueFlatFee, LowValueMode, RateBracket,
    RegistrationFee, RuleError, SalesTax, SalesTaxBase, TaxRule, TradePreference,
};
