use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Destination countries covered by the CAFTA-DR rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Jurisdiction {
    Honduras,
    Guatemala,
    ElSalvador,
    Nicaragua,
    CostaRica,
    DominicanRepublic,
}

/// Returned when a jurisdiction key matches neither a code nor a name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown jurisdiction '{0}'")]
pub struct ParseJurisdictionError(pub String);

impl Jurisdiction {
    pub fn all() -> &'static [Jurisdiction] {
        &[
            Jurisdiction::Honduras,
            Jurisdiction::Guatemala,
            Jurisdiction::ElSalvador,
            Jurisdiction::Nicaragua,
            Jurisdiction::CostaRica,
            Jurisdiction::DominicanRepublic,
        ]
    }

    /// ISO 3166-1 alpha-2 country code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Honduras => "HN",
            Self::Guatemala => "GT",
            Self::ElSalvador => "SV",
            Self::Nicaragua => "NI",
            Self::CostaRica => "CR",
            Self::DominicanRepublic => "DO",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Honduras => "Honduras",
            Self::Guatemala => "Guatemala",
            Self::ElSalvador => "El Salvador",
            Self::Nicaragua => "Nicaragua",
            Self::CostaRica => "Costa Rica",
            Self::DominicanRepublic => "Dominican Republic",
        }
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Jurisdiction {
    type Err = ParseJurisdictionError;

    /// Accepts the country code or the country name. Matching ignores case,
    /// and spaces, hyphens and underscores are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | '_' => ' ',
                other => other.to_ascii_lowercase(),
            })
            .collect();
        let key = key.split_whitespace().collect::<Vec<_>>().join(" ");

        Self::all()
            .iter()
            .copied()
            .find(|j| key == j.code().to_ascii_lowercase() || key == j.name().to_ascii_lowercase())
            .ok_or_else(|| ParseJurisdictionError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!("HN".parse(), Ok(Jurisdiction::Honduras));
        assert_eq!("do".parse(), Ok(Jurisdiction::DominicanRepublic));
        assert_eq!(" cr ".parse(), Ok(Jurisdiction::CostaRica));
    }

    #[test]
    fn parses_names_with_any_separator() {
        assert_eq!("honduras".parse(), Ok(Jurisdiction::Honduras));
        assert_eq!("El Salvador".parse(), Ok(Jurisdiction::ElSalvador));
        assert_eq!("el_salvador".parse(), Ok(Jurisdiction::ElSalvador));
        assert_eq!("dominican-republic".parse(), Ok(Jurisdiction::DominicanRepublic));
        assert_eq!("costa  rica".parse(), Ok(Jurisdiction::CostaRica));
    }

    #[test]
    fn rejects_unknown_keys() {
        let result: Result<Jurisdiction, _> = "atlantis".parse();

        assert_eq!(result, Err(ParseJurisdictionError("atlantis".to_string())));
    }

    #[test]
    fn codes_round_trip_through_parse() {
        for jurisdiction in Jurisdiction::all() {
            assert_eq!(jurisdiction.code().parse(), Ok(*jurisdiction));
        }
    }
}
