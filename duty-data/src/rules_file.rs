use std::fs;
use std::path::{Path, PathBuf};

use duty_core::{InvalidRule, Jurisdiction, JurisdictionRules, RuleTable};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when reading or writing a rule-table file.
#[derive(Debug, Error)]
pub enum RuleTableLoaderError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is defined more than once")]
    Duplicate(Jurisdiction),

    #[error(transparent)]
    Invalid(#[from] InvalidRule),
}

/// On-disk layout: one `[[jurisdictions]]` table per destination.
#[derive(Debug, Serialize, Deserialize)]
struct RuleTableFile {
    #[serde(default)]
    jurisdictions: Vec<JurisdictionRules>,
}

/// Reads and writes [`RuleTable`]s as TOML.
///
/// Decimal values are written as strings so rates survive the round trip
/// without float conversion:
///
/// ```toml
/// [[jurisdictions]]
/// jurisdiction = "honduras"
/// north_american = { kind = "waived" }
///
/// [jurisdictions.rule]
/// duty = { kind = "flat", rate = "0.15" }
/// ```
pub struct RuleTableLoader;

impl RuleTableLoader {
    /// Parses a rule table from TOML text.
    ///
    /// Every entry is validated; a jurisdiction listed twice is rejected
    /// rather than silently overwritten.
    pub fn parse(contents: &str) -> Result<RuleTable, RuleTableLoaderError> {
        let file: RuleTableFile = toml::from_str(contents)?;

        let mut table = RuleTable::new();
        for entry in file.jurisdictions {
            let jurisdiction = entry.jurisdiction;
            if table.insert(entry).is_some() {
                return Err(RuleTableLoaderError::Duplicate(jurisdiction));
            }
        }

        table.validate()?;
        debug!(jurisdictions = table.len(), "parsed rule table");

        Ok(table)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<RuleTable, RuleTableLoaderError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| RuleTableLoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents)
    }

    /// Renders a table in the same layout [`RuleTableLoader::parse`] reads.
    pub fn to_toml(table: &RuleTable) -> Result<String, RuleTableLoaderError> {
        let file = RuleTableFile {
            jurisdictions: table.entries().cloned().collect(),
        };

        Ok(toml::to_string_pretty(&file)?)
    }
}
