//! Named string patterns with canonical examples.
//!
//! Every pattern carries an example value that is echoed in violation
//! messages, so a failing config tells the author what a valid value looks
//! like.

use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt::{Debug, Formatter};

/// Lazily compiled, named regular expression.
pub struct Pattern {
    name: &'static str,
    source: &'static str,
    example: &'static str,
    compiled: OnceCell<Regex>,
}

impl Pattern {
    pub const fn new(name: &'static str, source: &'static str, example: &'static str) -> Self {
        Self {
            name,
            source,
            example,
            compiled: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn example(&self) -> &'static str {
        self.example
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex().is_match(value)
    }

    fn regex(&self) -> &Regex {
        self.compiled
            .get_or_init(|| Regex::new(self.source).expect("pattern sources are static and valid"))
    }
}

impl Debug for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// BCP-47 style locale tag: language plus optional subtags.
pub static LOCALE_TAG: Pattern = Pattern::new(
    "locale tag",
    r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{1,8})*$",
    "en-US",
);

/// ISO 4217 alphabetic currency code.
pub static CURRENCY_CODE: Pattern = Pattern::new("currency code", r"^[A-Z]{3}$", "USD");

/// Short machine-readable code such as a delivery service code.
pub static SERVICE_CODE: Pattern = Pattern::new(
    "service code",
    r"^[a-z0-9]+(_[a-z0-9]+)*$",
    "ground_advantage",
);

/// Absolute http(s) URL.
pub static HTTP_URL: Pattern = Pattern::new("URL", r"^https?://[^\s/$.?#][^\s]*$", "https://example.com");

#[cfg(test)]
mod tests {
    use super::{CURRENCY_CODE, HTTP_URL, LOCALE_TAG, SERVICE_CODE};

    #[test]
    fn locale_tag_accepts_language_and_region() {
        assert!(LOCALE_TAG.is_match("en"));
        assert!(LOCALE_TAG.is_match("en-GB"));
        assert!(LOCALE_TAG.is_match("zh-Hant-TW"));
        assert!(!LOCALE_TAG.is_match("english"));
        assert!(!LOCALE_TAG.is_match("en_GB"));
        assert!(!LOCALE_TAG.is_match("en-"));
    }

    #[test]
    fn currency_code_requires_three_upper_letters() {
        assert!(CURRENCY_CODE.is_match("EUR"));
        assert!(!CURRENCY_CODE.is_match("eur"));
        assert!(!CURRENCY_CODE.is_match("EURO"));
    }

    #[test]
    fn examples_satisfy_their_own_patterns() {
        for pattern in [&LOCALE_TAG, &CURRENCY_CODE, &SERVICE_CODE, &HTTP_URL] {
            assert!(
                pattern.is_match(pattern.example()),
                "{} example must match",
                pattern.name()
            );
        }
    }
}
