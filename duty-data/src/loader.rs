use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use duty_core::{
    EnvironmentalFee, FeeBracket, InvalidRule, Jurisdiction, RateBracket, RegistrationFee,
    RuleTable,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Errors that can occur when loading bracket overrides.
#[derive(Debug, Error)]
pub enum BracketLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("unknown jurisdiction '{0}'")]
    UnknownJurisdiction(String),

    #[error("invalid bracket table '{0}'")]
    InvalidTable(String),

    #[error("{0} has no rule to attach {1} brackets to")]
    JurisdictionNotFound(Jurisdiction, BracketTable),

    #[error("{0} has no consumption tax; add one to the rule file before overriding its brackets")]
    NoConsumptionTax(Jurisdiction),

    #[error(transparent)]
    Invalid(#[from] InvalidRule),
}

impl From<csv::Error> for BracketLoaderError {
    fn from(err: csv::Error) -> Self {
        BracketLoaderError::CsvParse(err.to_string())
    }
}

/// Bracket tables that can be replaced from CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BracketTable {
    /// Rate brackets; `value` is a fraction.
    Consumption,
    /// Fee brackets; `value` is a USD amount.
    Environmental,
    /// Fee brackets; `value` is a USD amount.
    Registration,
}

impl FromStr for BracketTable {
    type Err = BracketLoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "consumption" => Ok(BracketTable::Consumption),
            "environmental" => Ok(BracketTable::Environmental),
            "registration" => Ok(BracketTable::Registration),
            _ => Err(BracketLoaderError::InvalidTable(s.to_string())),
        }
    }
}

impl fmt::Display for BracketTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BracketTable::Consumption => "consumption",
            BracketTable::Environmental => "environmental",
            BracketTable::Registration => "registration",
        };
        f.write_str(name)
    }
}

/// A single record from a bracket override CSV file.
///
/// - `jurisdiction`: code or name (`HN`, `honduras`, `el salvador`)
/// - `table`: `consumption`, `environmental` or `registration`
/// - `lower_bound`: CIF value (USD) at which the bracket starts
/// - `value`: rate for consumption brackets, USD amount for fee brackets
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub jurisdiction: String,
    pub table: String,
    pub lower_bound: Decimal,
    pub value: Decimal,
}

fn resolve_group(
    record: &BracketRecord
) -> Result<(Jurisdiction, BracketTable), BracketLoaderError> {
    let jurisdiction = record
        .jurisdiction
        .parse::<Jurisdiction>()
        .map_err(|err| BracketLoaderError::UnknownJurisdiction(err.0))?;
    let table = record.table.parse::<BracketTable>()?;
    Ok((jurisdiction, table))
}

/// Loader for bracket tables from CSV files.
///
/// Each (jurisdiction, table) group in the file replaces that bracket table
/// wholesale, so a file only needs to mention the tables it changes.
pub struct BracketLoader;

impl BracketLoader {
    /// Parse bracket records from a CSV reader.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<BracketRecord>, BracketLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: BracketRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Apply bracket records to a rule table.
    ///
    /// For each (jurisdiction, table) group, the existing brackets are
    /// replaced by the group's records in file order. The updated table is
    /// validated before it replaces `rules`, so a failed apply leaves `rules`
    /// untouched.
    ///
    /// Environmental and registration fees become bracketed even if they were
    /// a percentage before. Consumption brackets need an existing consumption
    /// tax, because the file does not say which base the rates apply to.
    ///
    /// Returns the number of brackets written.
    pub fn apply(
        rules: &mut RuleTable,
        records: &[BracketRecord],
    ) -> Result<usize, BracketLoaderError> {
        let mut groups: BTreeMap<(Jurisdiction, BracketTable), Vec<&BracketRecord>> =
            BTreeMap::new();

        for record in records {
            groups.entry(resolve_group(record)?).or_default().push(record);
        }

        let mut updated = rules.clone();
        let mut written = 0;

        for ((jurisdiction, table), group_records) in groups {
            let entry = updated
                .get_mut(jurisdiction)
                .ok_or(BracketLoaderError::JurisdictionNotFound(jurisdiction, table))?;

            match table {
                BracketTable::Consumption => {
                    let consumption = entry
                        .rule
                        .consumption
                        .as_mut()
                        .ok_or(BracketLoaderError::NoConsumptionTax(jurisdiction))?;
                    consumption.brackets = group_records
                        .iter()
                        .map(|r| RateBracket {
                            lower_bound: r.lower_bound,
                            rate: r.value,
                        })
                        .collect();
                }
                BracketTable::Environmental => {
                    entry.rule.environmental_fee = Some(EnvironmentalFee::Bracketed {
                        brackets: fee_brackets(&group_records),
                    });
                }
                BracketTable::Registration => {
                    entry.rule.registration_fee = Some(RegistrationFee::Bracketed {
                        brackets: fee_brackets(&group_records),
                    });
                }
            }

            info!(%jurisdiction, %table, brackets = group_records.len(), "replaced bracket table");
            written += group_records.len();
        }

        updated.validate()?;
        *rules = updated;

        Ok(written)
    }
}

fn fee_brackets(records: &[&BracketRecord]) -> Vec<FeeBracket> {
    records
        .iter()
        .map(|r| FeeBracket {
            lower_bound: r.lower_bound,
            amount: r.value,
        })
        .collect()
}
