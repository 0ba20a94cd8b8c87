//! Loaders for rule-table files and bracket override CSVs.

mod loader;
mod preference;
mod rules_file;

pub use loader::{BracketLoader, BracketLoaderError, BracketRecord, BracketTable};
pub use preference::{ParsePreferenceError, parse_trade_preference, set_costa_rica_preference};
pub use rules_file::{RuleTableLoader, RuleTableLoaderError};
