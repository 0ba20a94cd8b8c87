use serde::{Deserialize, Serialize};

/// Manufacturing origin, as far as the trade preference is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginClass {
    /// Built in the United States (VIN prefixes 1, 4 and 5).
    NorthAmerican,
    /// Everything else, including Canadian and Mexican production.
    Other,
}

/// Outcome of classifying a vehicle identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Classified(OriginClass),
    /// The identifier was missing or malformed, so no conclusion was drawn.
    Indeterminate,
}

impl Origin {
    /// Collapses the classification into the class used for rule lookup.
    ///
    /// An indeterminate origin is treated as [`OriginClass::Other`], so no
    /// trade preference is ever granted without a conclusive identifier.
    pub fn resolve(self) -> OriginClass {
        match self {
            Origin::Classified(class) => class,
            Origin::Indeterminate => OriginClass::Other,
        }
    }

    pub fn is_north_american(self) -> bool {
        self.resolve() == OriginClass::NorthAmerican
    }

    pub fn label(self) -> &'static str {
        match self {
            Origin::Classified(OriginClass::NorthAmerican) => "North American",
            Origin::Classified(OriginClass::Other) => "Other",
            Origin::Indeterminate => "Indeterminate",
        }
    }
}
