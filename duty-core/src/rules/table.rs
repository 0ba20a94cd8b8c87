use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Jurisdiction, OriginClass, RuleError, TaxRule, TradePreference};

/// A rule that failed validation, tagged with its jurisdiction.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid rule for {jurisdiction}: {source}")]
pub struct InvalidRule {
    pub jurisdiction: Jurisdiction,
    #[source]
    pub source: RuleError,
}

/// Everything the calculator needs to know about one destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionRules {
    pub jurisdiction: Jurisdiction,

    /// How North American origin vehicles are treated. Vehicles of any other
    /// origin never receive a preference.
    pub north_american: TradePreference,

    pub rule: TaxRule,
}

impl JurisdictionRules {
    pub fn validate(&self) -> Result<(), InvalidRule> {
        let tag = |source: RuleError| InvalidRule {
            jurisdiction: self.jurisdiction,
            source,
        };

        if let TradePreference::Reduced { rate } = self.north_american {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(tag(RuleError::RateOutOfRange {
                    field: "reduced duty rate",
                    value: rate,
                }));
            }
        }

        self.rule.validate().map_err(tag)
    }

    /// The preference that applies to a vehicle of the given origin class.
    pub fn preference_for(
        &self,
        class: OriginClass,
    ) -> TradePreference {
        match class {
            OriginClass::NorthAmerican => self.north_american,
            OriginClass::Other => TradePreference::NotGranted,
        }
    }
}

/// A tax rule resolved for one (jurisdiction, origin class) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRule<'a> {
    pub rule: &'a TaxRule,
    pub preference: TradePreference,
}

/// Read-only lookup from jurisdiction to its tax rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    entries: BTreeMap<Jurisdiction, JurisdictionRules>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the rules for a jurisdiction, returning the previous
    /// entry if there was one.
    pub fn insert(
        &mut self,
        rules: JurisdictionRules,
    ) -> Option<JurisdictionRules> {
        self.entries.insert(rules.jurisdiction, rules)
    }

    pub fn get(
        &self,
        jurisdiction: Jurisdiction,
    ) -> Option<&JurisdictionRules> {
        self.entries.get(&jurisdiction)
    }

    pub fn get_mut(
        &mut self,
        jurisdiction: Jurisdiction,
    ) -> Option<&mut JurisdictionRules> {
        self.entries.get_mut(&jurisdiction)
    }

    pub fn resolve(
        &self,
        jurisdiction: Jurisdiction,
        class: OriginClass,
    ) -> Option<ResolvedRule<'_>> {
        self.get(jurisdiction).map(|entry| ResolvedRule {
            rule: &entry.rule,
            preference: entry.preference_for(class),
        })
    }

    /// Jurisdictions in the table, in declaration order of [`Jurisdiction`].
    pub fn jurisdictions(&self) -> impl Iterator<Item = Jurisdiction> + '_ {
        self.entries.keys().copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = &JurisdictionRules> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validates every entry.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvalidRule`] encountered.
    pub fn validate(&self) -> Result<(), InvalidRule> {
        self.entries.values().try_for_each(JurisdictionRules::validate)
    }
}
