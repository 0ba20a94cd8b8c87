//! Import duty calculations for CAFTA-DR destinations.
//!
//! This module provides origin classification, the shared rounding and
//! bracket helpers, and the step-by-step duty calculator.

pub mod common;
pub mod duty;
pub mod origin;

pub use duty::{DutyCalculator, DutyError};
pub use origin::{classify, classify_optional};
