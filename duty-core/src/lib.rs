pub mod calculations;
pub mod models;
pub mod rules;

pub use calculations::{DutyCalculator, DutyError, classify, classify_optional};
pub use models::*;
pub use rules::{InvalidRule, JurisdictionRules, ResolvedRule, RuleTable};
