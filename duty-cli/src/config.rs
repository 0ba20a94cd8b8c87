//! Application configuration loaded from TOML.
//!
//! ```toml
//! [defaults]
//! freight = "1500"
//! insurance = "300"
//!
//! [trade_preference]
//! costa_rica = { kind = "not_granted" }
//!
//! [rules]
//! file = "rules/cafta_dr.toml"
//! brackets = "rules/brackets.csv"
//!
//! [logging]
//! level = "info"
//! file = "duty-calc.log"
//! ```
//!
//! Only `[trade_preference]` is required. Its `costa_rica` key records a
//! policy decision (how US-built vehicles are treated in Costa Rica), so it
//! has no default and a config without it is rejected.

use std::fs;
use std::path::{Path, PathBuf};

use duty_core::{CostDefaults, TradePreference};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Configuration used when no `--config` file is given.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub defaults: CostDefaults,
    pub trade_preference: TradePreferenceConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[trade_preference]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradePreferenceConfig {
    /// Applied to the Costa Rica entry of whichever rule table is in use.
    pub costa_rica: TradePreference,
}

/// `[rules]` section. Both paths are relative to the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesConfig {
    /// TOML rule table replacing the built-in one.
    pub file: Option<PathBuf>,
    /// Bracket override CSV applied on top of the rule table.
    pub brackets: Option<PathBuf>,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Bare level or full `EnvFilter` directive.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Loads `path`, or the embedded default configuration when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&contents, &path.display().to_string())
            }
            None => Self::parse(DEFAULT_CONFIG, "built-in configuration"),
        }
    }

    /// Parses and validates configuration text. `origin` names the source in
    /// error messages.
    pub fn parse(
        contents: &str,
        origin: &str,
    ) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.freight < Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "default freight must not be negative, got {}",
                self.defaults.freight
            )));
        }
        if self.defaults.insurance < Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "default insurance must not be negative, got {}",
                self.defaults.insurance
            )));
        }
        if let TradePreference::Reduced { rate } = self.trade_preference.costa_rica {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "Costa Rica reduced rate must be between 0 and 1, got {rate}"
                )));
            }
        }
        Ok(())
    }
}
