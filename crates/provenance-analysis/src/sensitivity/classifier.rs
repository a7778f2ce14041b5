//! Keyword-based sensitivity classifier.

use once_cell::sync::Lazy;
use provenance_core::config::ScoringConfig;
use provenance_core::{DataAccessRef, SensitivityType};
use regex::Regex;
use tracing::warn;

/// Classifies table/field text into a [`SensitivityType`].
pub trait SensitivityClassifier: Send + Sync {
    fn classify(&self, text: &str) -> SensitivityType;

    /// Field first; a sensitive table name covers fields that say nothing.
    fn classify_field(&self, table: &str, field: &str) -> SensitivityType {
        match self.classify(field) {
            SensitivityType::Unknown => self.classify(table),
            sensitive => sensitive,
        }
    }

    /// Most severe class over the accessed fields, or the table itself when
    /// the access names no fields.
    fn classify_access(&self, access: &DataAccessRef) -> SensitivityType {
        if access.fields.is_empty() {
            return self.classify(&access.table);
        }
        access
            .fields
            .iter()
            .map(|field| self.classify_field(&access.table, field))
            .max_by_key(|s| s.severity())
            .unwrap_or(SensitivityType::Unknown)
    }
}

/// Keyword alternations per class, most severe first, so `clock_pin_hash`
/// is credentials even if a weaker keyword also matches.
const KEYWORDS: &[(SensitivityType, &str)] = &[
    (
        SensitivityType::Credentials,
        "password|passwd|pwd|passphrase|secret|client_secret|token|api_?key|access_key|private_key|secret_key|signing_key|credential|pin|otp|totp|mfa|salt|session_id",
    ),
    (
        SensitivityType::Financial,
        "credit_card|card_number|cc_number|cvv|cvc|iban|swift|routing_number|account_number|bank|bank_account|salary|income|balance|payment|billing|invoice|tax_id",
    ),
    (
        SensitivityType::Health,
        "diagnosis|medical|health|prescription|medication|condition|allerg(?:y|ie)|blood_type|patient|treatment|symptom|insurance_id",
    ),
    (
        SensitivityType::Pii,
        "ssn|social_security|email|phone|phone_number|address|street|postal_code|zip_code|dob|date_of_birth|birth_date|birthday|first_name|last_name|full_name|passport|driver_license|national_id|ip_address|gender",
    ),
];

/// Whole `_`-delimited segments only, with an optional plural `s`.
static CATEGORIES: Lazy<Vec<(SensitivityType, Regex)>> = Lazy::new(|| {
    KEYWORDS
        .iter()
        .filter_map(|(sensitivity, words)| {
            Regex::new(&format!(r"(?:^|_)(?:{})s?(?:_|$)", words))
                .ok()
                .map(|re| (*sensitivity, re))
        })
        .collect()
});

static DEFAULT: Lazy<KeywordClassifier> = Lazy::new(KeywordClassifier::default);

/// Shared classifier with the built-in keyword tables and no overrides.
pub fn default_classifier() -> &'static KeywordClassifier {
    &DEFAULT
}

/// `clockPinHash`, `clock-pin-hash`, `Clock.PinHash` all become `clock_pin_hash`.
pub fn normalize_identifier(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && prev_lower_or_digit {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        } else {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            prev_lower_or_digit = false;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Built-in keyword tables plus user overrides.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    /// Normalized keyword -> class. Checked before the built-in tables.
    overrides: Vec<(String, SensitivityType)>,
}

impl KeywordClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Honor `scoring.sensitivity_overrides`. Unknown class names are skipped.
    pub fn from_config(config: &ScoringConfig) -> Self {
        let mut classifier = Self::new();
        for (keyword, class) in &config.sensitivity_overrides {
            match SensitivityType::from_name(class) {
                Some(sensitivity) => classifier = classifier.with_override(keyword, sensitivity),
                None => warn!(keyword = %keyword, class = %class, "ignoring unknown sensitivity override"),
            }
        }
        classifier
    }

    pub fn with_override(mut self, keyword: &str, sensitivity: SensitivityType) -> Self {
        let keyword = normalize_identifier(keyword);
        if !keyword.is_empty() {
            self.overrides.retain(|(k, _)| *k != keyword);
            self.overrides.push((keyword, sensitivity));
            // Longer keywords are more specific.
            self.overrides.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        }
        self
    }
}

impl SensitivityClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> SensitivityType {
        let normalized = normalize_identifier(text);
        if normalized.is_empty() {
            return SensitivityType::Unknown;
        }

        let padded = format!("_{}_", normalized);
        if let Some((_, sensitivity)) = self
            .overrides
            .iter()
            .find(|(keyword, _)| padded.contains(&format!("_{}_", keyword)))
        {
            return *sensitivity;
        }

        CATEGORIES
            .iter()
            .find(|(_, re)| re.is_match(&normalized))
            .map(|(sensitivity, _)| *sensitivity)
            .unwrap_or(SensitivityType::Unknown)
    }
}
