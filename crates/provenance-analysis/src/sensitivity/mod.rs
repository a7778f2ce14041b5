//! Data sensitivity classification and regulation mapping.
//!
//! Classification is a pluggable [`SensitivityClassifier`]; the default
//! [`KeywordClassifier`] matches keyword tables against identifier segments and
//! honors `scoring.sensitivity_overrides`.

mod classifier;
mod regulations;

pub use classifier::{default_classifier, normalize_identifier, KeywordClassifier, SensitivityClassifier};
pub use regulations::{Regulation, RegulationMapper};
