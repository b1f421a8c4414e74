//! Locale tag parsing and normalization.

use crate::validation::assert::check_pattern;
use crate::validation::pattern::LOCALE_TAG;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Normalized locale tag such as `en` or `en-GB`.
///
/// The language subtag is lowercased; two-letter alphabetic subtags (regions)
/// are uppercased; other subtags keep their spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleTag(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLocaleTag {
    pub value: String,
    pub example: &'static str,
}

impl Display for InvalidLocaleTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid locale tag `{}` (example: {})",
            self.value, self.example
        )
    }
}

impl Error for InvalidLocaleTag {}

impl LocaleTag {
    pub fn parse(value: &str) -> Result<Self, InvalidLocaleTag> {
        let trimmed = value.trim();
        check_pattern(trimmed, &LOCALE_TAG).map_err(|_| InvalidLocaleTag {
            value: value.to_string(),
            example: LOCALE_TAG.example(),
        })?;

        let normalized = trimmed
            .split('-')
            .enumerate()
            .map(|(index, subtag)| {
                if index == 0 {
                    subtag.to_ascii_lowercase()
                } else if subtag.len() == 2 && subtag.chars().all(|c| c.is_ascii_alphabetic()) {
                    subtag.to_ascii_uppercase()
                } else {
                    subtag.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("-");
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag, e.g. `en` for `en-GB`.
    pub fn language(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// This tag followed by its truncations, most specific first:
    /// `zh-Hant-TW`, `zh-Hant`, `zh`.
    pub fn truncations(&self) -> Vec<LocaleTag> {
        let subtags = self.0.split('-').collect::<Vec<_>>();
        (1..=subtags.len())
            .rev()
            .map(|len| Self(subtags[..len].join("-")))
            .collect()
    }

    fn eq_ignore_case(&self, other: &LocaleTag) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }

    pub(crate) fn matches(&self, other: &LocaleTag) -> bool {
        self == other || self.eq_ignore_case(other)
    }
}

impl Default for LocaleTag {
    /// `en-US`.
    fn default() -> Self {
        Self("en-US".to_string())
    }
}

impl Display for LocaleTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LocaleTag {
    type Err = InvalidLocaleTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LocaleTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LocaleTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::LocaleTag;

    #[test]
    fn normalizes_case() {
        assert_eq!(LocaleTag::parse("EN-gb").unwrap().as_str(), "en-GB");
        assert_eq!(LocaleTag::parse("zh-Hant-tw").unwrap().as_str(), "zh-Hant-TW");
    }

    #[test]
    fn rejects_malformed_tags() {
        for raw in ["", "e", "english", "en_US", "en-", "-en", "en-toolongsubtag"] {
            assert!(LocaleTag::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn truncations_run_from_specific_to_general() {
        let tag = LocaleTag::parse("zh-Hant-TW").unwrap();
        let chain = tag
            .truncations()
            .into_iter()
            .map(|tag| tag.to_string())
            .collect::<Vec<_>>();
        assert_eq!(chain, vec!["zh-Hant-TW", "zh-Hant", "zh"]);
        assert_eq!(tag.language(), "zh");
    }
}
