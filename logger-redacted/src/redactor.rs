use base64::{engine::general_purpose, Engine as _};
use regex::Regex;
use sha2::{Digest, Sha256};

#[allow(clippy::unwrap_used)]
mod patterns {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        pub static ref EMAIL_REGEX: Regex =
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
        pub static ref MRN_REGEX: Regex = Regex::new(r"\bMRN-\d{8}-[0-9A-F]{6}\b").unwrap();
        pub static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
        pub static ref CREDIT_CARD_REGEX: Regex =
            Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap();
        pub static ref IP_REGEX: Regex = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").unwrap();
        pub static ref PHONE_REGEX: Regex =
            Regex::new(r"(?:\+\d{1,3}[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b").unwrap();
    }
}

use patterns::{CREDIT_CARD_REGEX, EMAIL_REGEX, IP_REGEX, MRN_REGEX, PHONE_REGEX, SSN_REGEX};

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ssn: bool,
    pub redact_credit_cards: bool,
    pub redact_ip_addresses: bool,
    pub redact_mrn: bool,
    /// Replace values with a short stable hash instead of a mask
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            redact_credit_cards: true,
            redact_ip_addresses: true,
            redact_mrn: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    /// Configuration that leaves text untouched
    pub fn disabled() -> Self {
        Self {
            redact_emails: false,
            redact_phones: false,
            redact_ssn: false,
            redact_credit_cards: false,
            redact_ip_addresses: false,
            redact_mrn: false,
            hash_for_correlation: false,
            custom_patterns: Vec::new(),
        }
    }

    /// Add an organization specific pattern
    pub fn with_custom_pattern(mut self, pattern: Regex, replacement: impl Into<String>) -> Self {
        self.custom_patterns.push((pattern, replacement.into()));
        self
    }
}

/// PII redactor for log messages
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl Default for PiiRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// Redact every enabled category from `text`.
    ///
    /// Categories run from most to least specific so a card number is not
    /// first half-consumed by the phone pattern.
    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_mrn {
            result = self.replace(&MRN_REGEX, &result, "MRN", "MRN-********-******");
        }
        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }
        if self.config.redact_credit_cards {
            result = self.replace(&CREDIT_CARD_REGEX, &result, "CC", "****-****-****-****");
        }
        if self.config.redact_ssn {
            result = self.replace(&SSN_REGEX, &result, "SSN", "***-**-****");
        }
        if self.config.redact_ip_addresses {
            result = self.redact_ip_addresses(&result);
        }
        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", "(***) ***-****");
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// True when `text` contains anything this redactor would change
    pub fn contains_pii(&self, text: &str) -> bool {
        self.redact(text) != text
    }

    fn replace(&self, pattern: &Regex, text: &str, label: &str, mask: &str) -> String {
        pattern
            .replace_all(text, |caps: &regex::Captures| {
                if self.config.hash_for_correlation {
                    format!("{}[{}]", label, self.hash_value(&caps[0]))
                } else {
                    mask.to_string()
                }
            })
            .to_string()
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = &caps[0];
                if self.config.hash_for_correlation {
                    return format!("EMAIL[{}]", self.hash_value(email));
                }
                match email.split_once('@') {
                    Some((local, domain)) => {
                        let first_local: String = local.chars().take(1).collect();
                        let first_domain: String = domain.chars().take(1).collect();
                        format!("{first_local}***@{first_domain}***")
                    }
                    None => "***@***".to_string(),
                }
            })
            .to_string()
    }

    fn redact_ip_addresses(&self, text: &str) -> String {
        IP_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let ip = &caps[0];
                if self.config.hash_for_correlation {
                    return format!("IP[{}]", self.hash_value(ip));
                }
                let parts: Vec<&str> = ip.split('.').collect();
                match (parts.first(), parts.last()) {
                    (Some(first), Some(last)) if parts.len() == 4 => format!("{first}.***.***.{last}"),
                    _ => "***.***.***.***".to_string(),
                }
            })
            .to_string()
    }

    fn hash_value(&self, value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        // First 8 bytes keep the marker short while staying stable across runs
        general_purpose::STANDARD_NO_PAD.encode(digest.get(..8).unwrap_or_default())
    }
}
