//! Localizable display text shared by definition entities.

use crate::entity::EntityError;
use crate::locale::{LocaleError, LocaleOverlays};
use crate::validation::assert;
use crate::validation::schema::{optional, Rule};
use crate::validation::violation::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User-facing name and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DisplayText {
    /// Rule for one locale's overrides.
    pub fn overlay_rule() -> Rule {
        Rule::object([
            optional("name", Rule::string()),
            optional("description", Rule::string()),
        ])
    }

    pub(crate) fn from_fields(fields: &Map<String, Value>) -> Result<Self, EntityError> {
        Ok(Self {
            name: assert::string(fields.get("name"), "name", None)?,
            description: assert::optional_string(fields.get("description"), "description")?,
        })
    }
}

/// Display text plus its per-locale overrides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedText {
    #[serde(flatten)]
    text: DisplayText,
    #[serde(skip_serializing_if = "LocaleOverlays::is_empty")]
    localization: LocaleOverlays,
}

impl LocalizedText {
    pub(crate) fn from_fields(fields: &Map<String, Value>) -> Result<Self, EntityError> {
        let localization =
            LocaleOverlays::from_value(fields.get("localization"), DisplayText::overlay_rule())
                .map_err(|err| err.under(&FieldPath::root().join("localization")))?;
        Ok(Self {
            text: DisplayText::from_fields(fields)?,
            localization,
        })
    }

    pub fn name(&self) -> &str {
        &self.text.name
    }

    pub fn description(&self) -> Option<&str> {
        self.text.description.as_deref()
    }

    pub fn localization(&self) -> &LocaleOverlays {
        &self.localization
    }

    /// The text as seen from `locale`, overlays left in place.
    pub fn localize(&self, locale: &str) -> Result<Self, LocaleError> {
        Ok(Self {
            text: self.localization.localize(&self.text, locale)?,
            localization: self.localization.clone(),
        })
    }
}
