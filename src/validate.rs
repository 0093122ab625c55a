//! Domain name validation and normalization.

use std::collections::HashSet;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_security::MixedScript;

use crate::error::{Result, Web3NameError};
use crate::namehash::is_encoded_labelhash;

pub const MIN_DOMAIN_LENGTH: usize = 3;
pub const MAX_DOMAIN_LENGTH: usize = 512;

/// TLDs whose registries accept labels shorter than [`MIN_DOMAIN_LENGTH`].
pub const DEFAULT_SHORT_LABEL_EXEMPT_TLDS: [&str; 3] = ["bnb", "arb", "eth"];

/// Structural and markup characters that may never appear in a domain.
const SPECIAL_CHARS: &[char] = &[
    '*', '|', '\\', '"', ':', '<', '>', '[', ']', '{', '}', '`', '(', ')', '\'', ';', '@', '&', '$',
];

/// Static tables the validator consults.
#[derive(Debug, Clone)]
pub struct NameRules {
    short_label_exempt_tlds: HashSet<String>,
    allow_list: HashSet<String>,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            short_label_exempt_tlds: DEFAULT_SHORT_LABEL_EXEMPT_TLDS
                .iter()
                .map(|tld| tld.to_string())
                .collect(),
            allow_list: HashSet::new(),
        }
    }
}

impl NameRules {
    pub fn new(
        short_label_exempt_tlds: impl IntoIterator<Item = String>,
        allow_list: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            short_label_exempt_tlds: short_label_exempt_tlds
                .into_iter()
                .map(|tld| tld.to_lowercase())
                .collect(),
            allow_list: allow_list.into_iter().map(|n| n.to_lowercase()).collect(),
        }
    }

    /// Add grandfathered names that bypass the length check.
    pub fn with_allow_list(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.allow_list
            .extend(names.into_iter().map(|n| n.into().to_lowercase()));
        self
    }

    pub fn is_short_label_exempt(&self, tld: &str) -> bool {
        self.short_label_exempt_tlds.contains(&tld.to_lowercase())
    }

    pub fn is_allow_listed(&self, name: &str) -> bool {
        self.allow_list.contains(&name.to_lowercase())
    }

    /// Validate a name and return it normalized label by label. The checks
    /// run on the normalized form.
    pub fn validate_name(&self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(invalid(name, "name is empty"));
        }

        let normalized = normalize(name);
        let labels: Vec<&str> = normalized.split('.').collect();
        if labels.iter().any(|label| label.is_empty()) {
            return Err(invalid(name, "domain cannot have empty labels"));
        }

        let (mut domain, suffix) = match labels.split_last() {
            Some((suffix, rest)) if !rest.is_empty() => (rest.join("."), *suffix),
            _ => (normalized.clone(), ""),
        };
        // <label>.eth.bnb names are registered under the bridged eth.bnb parent
        if labels.len() == 3 && suffix == "bnb" && labels[1] == "eth" {
            domain = labels[0].to_string();
        }

        let min_length = if self.is_short_label_exempt(suffix) {
            1
        } else {
            MIN_DOMAIN_LENGTH
        };
        if !has_valid_length(&domain, min_length) && !self.is_allow_listed(&normalized) {
            return Err(invalid(name, "invalid length"));
        }

        if let Some(c) = domain.chars().find(|c| is_disallowed_char(*c)) {
            return Err(invalid(name, &format!("disallowed character {c:?}")));
        }
        if !domain.is_single_script() {
            return Err(invalid(name, "mixed-script or confusable characters"));
        }

        Ok(normalized)
    }
}

fn invalid(name: &str, reason: &str) -> Web3NameError {
    Web3NameError::InvalidName(format!("{name}: {reason}"))
}

/// Count user-perceived characters: combining marks attach to the character
/// before them, everything else (including each emoji code point) counts once.
pub fn count_characters(value: &str) -> usize {
    value.chars().filter(|c| !is_combining_mark(*c)).count()
}

fn has_valid_length(domain: &str, min_length: usize) -> bool {
    (min_length..=MAX_DOMAIN_LENGTH).contains(&count_characters(domain))
}

fn is_disallowed_char(c: char) -> bool {
    if SPECIAL_CHARS.contains(&c) {
        return true;
    }
    matches!(
        c,
        '\u{0000}'..='\u{002c}'
            | '\u{002e}'..='\u{002f}'
            | '\u{003a}'..='\u{005e}'
            | '\u{0060}'
            | '\u{007b}'..='\u{007f}'
            | '\u{200b}'
            | '\u{200c}'
            | '\u{200d}'
            | '\u{feff}'
    )
}

/// Lowercase and NFC-compose one label.
pub fn normalize_label(label: &str) -> String {
    label.to_lowercase().nfc().collect()
}

/// Normalize every label of a name, leaving encoded labelhashes untouched.
pub fn normalize(name: &str) -> String {
    name.split('.')
        .map(|label| {
            if is_encoded_labelhash(label) {
                label.to_string()
            } else {
                normalize_label(label)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
