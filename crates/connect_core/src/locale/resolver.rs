//! Field-level locale overlay resolution.

use crate::locale::tag::{InvalidLocaleTag, LocaleTag};
use crate::validation::pattern::LOCALE_TAG;
use crate::validation::schema::{Rule, Schema};
use crate::validation::violation::{FieldPath, ValidationResult, Violations};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Partial field overrides for one locale, keyed by wire field name.
pub type FieldOverlay = Map<String, Value>;

/// Locale resolution failure.
#[derive(Debug)]
pub enum LocaleError {
    InvalidTag(InvalidLocaleTag),
    /// The base value does not serialize to a JSON object.
    NotARecord,
    /// An overlay value does not fit the field it overrides.
    Overlay(serde_json::Error),
}

impl Display for LocaleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTag(err) => write!(f, "{err}"),
            Self::NotARecord => write!(f, "only record values can be localized"),
            Self::Overlay(err) => write!(f, "locale overlay does not fit its record: {err}"),
        }
    }
}

impl Error for LocaleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTag(err) => Some(err),
            Self::NotARecord => None,
            Self::Overlay(err) => Some(err),
        }
    }
}

impl From<InvalidLocaleTag> for LocaleError {
    fn from(value: InvalidLocaleTag) -> Self {
        Self::InvalidTag(value)
    }
}

/// Locale tag → partial field overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LocaleOverlays {
    entries: BTreeMap<LocaleTag, FieldOverlay>,
}

impl LocaleOverlays {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema for a raw overlay map whose entries follow `fields`.
    pub fn rule(fields: Rule) -> Rule {
        Rule::map(fields).pattern(&LOCALE_TAG)
    }

    /// Parses a raw overlay map, reporting every malformed entry.
    ///
    /// Tags that collide after normalization (`en-gb`, `en-GB`) are rejected.
    pub fn from_value(value: Option<&Value>, fields: Rule) -> ValidationResult<Self> {
        let Some(raw) = value.filter(|inner| !inner.is_null()) else {
            return Ok(Self::new());
        };
        Schema::new("localization", Self::rule(fields)).validate(raw)?;

        let mut overlays = Self::new();
        let mut violations = Violations::new();
        if let Value::Object(entries) = raw {
            for (raw_tag, overlay) in entries {
                let path = FieldPath::root().join(raw_tag.as_str());
                let Ok(tag) = LocaleTag::parse(raw_tag) else {
                    violations.report(&path, "is not a valid locale tag");
                    continue;
                };
                let Value::Object(fields) = overlay else {
                    continue;
                };
                if overlays.entries.contains_key(&tag) {
                    violations.report(&path, format!("duplicates locale {tag}"));
                    continue;
                }
                overlays.entries.insert(tag, fields.clone());
            }
        }
        violations.finish("localization")?;
        Ok(overlays)
    }

    pub fn insert(&mut self, tag: LocaleTag, overlay: FieldOverlay) {
        self.entries.insert(tag, overlay);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn tags(&self) -> impl Iterator<Item = &LocaleTag> {
        self.entries.keys()
    }

    pub fn get(&self, tag: &LocaleTag) -> Option<&FieldOverlay> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate.matches(tag))
            .map(|(_, overlay)| overlay)
    }

    /// Overlays consulted for `tag`, most specific first.
    ///
    /// The tag and its truncations come first, then any other overlay sharing
    /// the same language in lexical order. Tags without overlay data are
    /// skipped, so an unknown locale yields an empty chain.
    pub fn fallback_chain(&self, tag: &LocaleTag) -> Vec<&LocaleTag> {
        let mut chain: Vec<&LocaleTag> = Vec::new();
        for candidate in tag.truncations() {
            if let Some((known, _)) = self
                .entries
                .iter()
                .find(|(known, _)| known.matches(&candidate))
            {
                if !chain.contains(&known) {
                    chain.push(known);
                }
            }
        }
        for known in self.entries.keys() {
            if known.language().eq_ignore_ascii_case(tag.language()) && !chain.contains(&known) {
                chain.push(known);
            }
        }
        chain
    }

    /// Resolves every field independently along the fallback chain, base
    /// fields and overlay-only fields alike.
    pub fn resolve_fields(
        &self,
        base: &Map<String, Value>,
        locale: &str,
    ) -> Result<Map<String, Value>, LocaleError> {
        let tag = LocaleTag::parse(locale)?;
        let chain = self.fallback_chain(&tag);
        let mut resolved = base.clone();
        if chain.is_empty() {
            return Ok(resolved);
        }
        for (name, value) in resolved.iter_mut() {
            let overlay_value = chain.iter().find_map(|known| {
                self.entries
                    .get(*known)
                    .and_then(|overlay| overlay.get(name))
                    .filter(|candidate| !candidate.is_null())
            });
            if let Some(found) = overlay_value {
                *value = found.clone();
            }
        }
        // Fields the base leaves out can still be supplied by an overlay.
        for known in &chain {
            let Some(overlay) = self.entries.get(*known) else {
                continue;
            };
            for (name, value) in overlay {
                if !value.is_null() && !resolved.contains_key(name) {
                    resolved.insert(name.clone(), value.clone());
                }
            }
        }
        debug!(
            "event=locale_resolve module=locale status=ok locale={} chain_len={}",
            tag,
            chain.len()
        );
        Ok(resolved)
    }

    /// Applies the overlays to a serializable record.
    ///
    /// When no overlay applies the result is a clone of `base`.
    pub fn localize<T>(&self, base: &T, locale: &str) -> Result<T, LocaleError>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let tag = LocaleTag::parse(locale)?;
        if self.fallback_chain(&tag).is_empty() {
            return Ok(base.clone());
        }
        let Value::Object(fields) = serde_json::to_value(base).map_err(LocaleError::Overlay)?
        else {
            return Err(LocaleError::NotARecord);
        };
        let resolved = self.resolve_fields(&fields, tag.as_str())?;
        serde_json::from_value(Value::Object(resolved)).map_err(LocaleError::Overlay)
    }
}

/// A base record plus its locale overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct Localized<T> {
    base: T,
    overlays: LocaleOverlays,
}

impl<T> Localized<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn new(base: T, overlays: LocaleOverlays) -> Self {
        Self { base, overlays }
    }

    pub fn base(&self) -> &T {
        &self.base
    }

    pub fn overlays(&self) -> &LocaleOverlays {
        &self.overlays
    }

    /// Returns the record as seen from `locale`.
    ///
    /// When no overlay applies the result is a clone of the base record.
    pub fn localize(&self, locale: &str) -> Result<T, LocaleError> {
        self.overlays.localize(&self.base, locale)
    }
}

#[cfg(test)]
mod tests {
    use super::{LocaleError, LocaleOverlays, Localized};
    use crate::validation::schema::{optional, Rule};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Label {
        name: String,
        description: String,
    }

    fn label_fields() -> Rule {
        Rule::object([
            optional("name", Rule::string()),
            optional("description", Rule::string()),
        ])
    }

    fn localized(overlays: serde_json::Value) -> Localized<Label> {
        Localized::new(
            Label {
                name: "X".to_string(),
                description: "Y".to_string(),
            },
            LocaleOverlays::from_value(Some(&overlays), label_fields()).unwrap(),
        )
    }

    #[test]
    fn region_overlay_replaces_only_supplied_fields() {
        let label = localized(json!({ "en-GB": { "name": "Z" } }));
        let resolved = label.localize("en-GB").unwrap();
        assert_eq!(resolved.name, "Z");
        assert_eq!(resolved.description, "Y");
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Caption {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    }

    #[test]
    fn overlay_only_field_is_resolved() {
        let caption = Localized::new(
            Caption {
                name: "Parcel".to_string(),
                description: None,
            },
            LocaleOverlays::from_value(
                Some(&json!({
                    "fr": { "name": "Colis", "description": "Transporteur" },
                    "fr-CA": { "name": "Colis CA" }
                })),
                label_fields(),
            )
            .unwrap(),
        );

        let resolved = caption.localize("fr-CA").unwrap();
        assert_eq!(resolved.name, "Colis CA");
        assert_eq!(resolved.description.as_deref(), Some("Transporteur"));
        assert_eq!(caption.localize("de").unwrap().description, None);
    }

    #[test]
    fn unknown_locale_equals_base() {
        let label = localized(json!({ "en-GB": { "name": "Z" } }));
        assert_eq!(&label.localize("de").unwrap(), label.base());
    }

    #[test]
    fn language_request_fills_gaps_from_regional_overlays() {
        let label = localized(json!({
            "en": { "name": "English name" },
            "en-GB": { "description": "British description" },
            "en-US": { "description": "American description", "name": "US name" }
        }));
        let resolved = label.localize("en").unwrap();
        assert_eq!(resolved.name, "English name");
        assert_eq!(resolved.description, "British description");
    }

    #[test]
    fn regional_request_falls_back_to_language() {
        let label = localized(json!({
            "en": { "description": "generic" },
            "en-AU": { "name": "Aussie" }
        }));
        let resolved = label.localize("en-AU").unwrap();
        assert_eq!(resolved.name, "Aussie");
        assert_eq!(resolved.description, "generic");
    }

    #[test]
    fn tag_matching_is_case_insensitive() {
        let label = localized(json!({ "en-GB": { "name": "Z" } }));
        assert_eq!(label.localize("en-gb").unwrap().name, "Z");
    }

    #[test]
    fn malformed_locale_fails() {
        let label = localized(json!({}));
        assert!(matches!(
            label.localize("en_GB"),
            Err(LocaleError::InvalidTag(_))
        ));
    }

    #[test]
    fn null_overlay_values_do_not_override() {
        let label = localized(json!({ "fr": { "name": null, "description": "Zed" } }));
        let resolved = label.localize("fr-CA").unwrap();
        assert_eq!(resolved.name, "X");
        assert_eq!(resolved.description, "Zed");
    }

    #[test]
    fn overlay_map_violations_are_aggregated() {
        let err = LocaleOverlays::from_value(
            Some(&json!({
                "english": { "name": "A" },
                "en-GB": { "name": 5 },
                "fr": "oops"
            })),
            label_fields(),
        )
        .unwrap_err();
        assert_eq!(err.len(), 3, "{err}");
    }

    #[test]
    fn normalized_duplicates_are_rejected() {
        let err = LocaleOverlays::from_value(
            Some(&json!({ "en-GB": { "name": "A" }, "en-gb": { "name": "B" } })),
            label_fields(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicates locale en-GB"));
    }
}
