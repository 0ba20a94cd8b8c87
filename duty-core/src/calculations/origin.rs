//! Vehicle origin classification from the VIN world manufacturer identifier.
//!
//! The first VIN character encodes the country of manufacture. Only vehicles
//! built in the United States (`1`, `4`, `5`) qualify for the CAFTA-DR duty
//! preference. Canadian (`2`) and Mexican (`3`) production are North American
//! geographically but are not covered, so they classify as
//! [`OriginClass::Other`].
//!
//! # Example
//!
//! ```
//! use duty_core::calculations::classify;
//! use duty_core::{Origin, OriginClass};
//!
//! assert_eq!(
//!     classify("1N6AD0ER4DN751317"),
//!     Origin::Classified(OriginClass::NorthAmerican)
//! );
//! assert_eq!(classify("short"), Origin::Indeterminate);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::{Origin, OriginClass};

/// 17 characters from the ISO 3779 alphabet (letters I, O and Q never appear).
static VIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-HJ-NPR-Z0-9]{17}$").expect("VIN pattern is valid"));

/// Classifies a vehicle identifier by its first character.
///
/// Anything that is not a well-formed 17-character VIN yields
/// [`Origin::Indeterminate`] rather than a guess. Lowercase input and
/// surrounding whitespace are tolerated.
pub fn classify(identifier: &str) -> Origin {
    let vin = identifier.trim().to_ascii_uppercase();

    if !VIN_PATTERN.is_match(&vin) {
        trace!(identifier, "identifier is not a 17-character VIN");
        return Origin::Indeterminate;
    }

    match vin.as_bytes()[0] {
        b'1' | b'4' | b'5' => Origin::Classified(OriginClass::NorthAmerican),
        _ => Origin::Classified(OriginClass::Other),
    }
}

/// Classifies an optional identifier; a missing one is indeterminate.
pub fn classify_optional(identifier: Option<&str>) -> Origin {
    identifier.map_or(Origin::Indeterminate, classify)
}
