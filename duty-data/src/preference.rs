//! Costa Rica trade-preference decision, as given on the command line.

use duty_core::{Jurisdiction, RuleTable, TradePreference};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParsePreferenceError {
    #[error("expected waived, not-granted or a rate, got '{0}'")]
    Unrecognized(String),

    #[error("reduced rate must be between 0 and 1, got {0}")]
    RateOutOfRange(Decimal),
}

/// Parses `waived`, `not-granted` (or `not_granted`), or a reduced duty rate
/// such as `0.005`.
pub fn parse_trade_preference(value: &str) -> Result<TradePreference, ParsePreferenceError> {
    match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "waived" => Ok(TradePreference::Waived),
        "not-granted" => Ok(TradePreference::NotGranted),
        other => {
            let rate: Decimal = other
                .parse()
                .map_err(|_| ParsePreferenceError::Unrecognized(value.to_string()))?;
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(ParsePreferenceError::RateOutOfRange(rate));
            }
            Ok(TradePreference::Reduced { rate })
        }
    }
}

/// Sets the North American preference of the Costa Rica entry, whatever the
/// table was loaded from. Returns `false` when the table has no Costa Rica
/// entry.
pub fn set_costa_rica_preference(
    table: &mut RuleTable,
    preference: TradePreference,
) -> bool {
    match table.get_mut(Jurisdiction::CostaRica) {
        Some(entry) => {
            entry.north_american = preference;
            true
        }
        None => false,
    }
}
