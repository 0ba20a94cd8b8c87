//! Tax rule tables keyed by destination jurisdiction.

mod cafta_dr;
mod table;

pub use table::{InvalidRule, JurisdictionRules, ResolvedRule, RuleTable};
