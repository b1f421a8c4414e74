//! Packaging offered by a carrier.

use crate::domain::text::{DisplayText, LocalizedText};
use crate::entity::{BuildContext, Entity, EntityError, Identifiable};
use crate::locale::{LocaleError, LocaleOverlays};
use crate::validation::assert;
use crate::validation::pattern::SERVICE_CODE;
use crate::validation::schema::{field, optional, Rule, Schema};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

static PACKAGING_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "packaging",
        Rule::object([
            field("id", Rule::Uuid),
            field("name", Rule::string()),
            optional("description", Rule::string()),
            optional("code", Rule::string().pattern(&SERVICE_CODE)),
            optional("requiresWeight", Rule::Bool),
            optional("requiresDimensions", Rule::Bool),
            optional("localization", LocaleOverlays::rule(DisplayText::overlay_rule())),
        ]),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Packaging {
    id: Uuid,
    #[serde(flatten)]
    text: LocalizedText,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    requires_weight: bool,
    requires_dimensions: bool,
}

impl Packaging {
    pub fn name(&self) -> &str {
        self.text.name()
    }

    pub fn description(&self) -> Option<&str> {
        self.text.description()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn requires_weight(&self) -> bool {
        self.requires_weight
    }

    pub fn requires_dimensions(&self) -> bool {
        self.requires_dimensions
    }

    pub fn localize(&self, locale: &str) -> Result<Self, LocaleError> {
        Ok(Self {
            text: self.text.localize(locale)?,
            ..self.clone()
        })
    }
}

impl Identifiable for Packaging {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Packaging {
    fn schema() -> &'static Schema {
        &PACKAGING_SCHEMA
    }

    fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let code = match fields.get("code") {
            None | Some(Value::Null) => None,
            raw => Some(assert::matches(raw, "code", &SERVICE_CODE)?),
        };
        Ok(Self {
            id: assert::uuid(fields.get("id"), "id")?,
            text: LocalizedText::from_fields(fields)?,
            code,
            requires_weight: assert::boolean(fields.get("requiresWeight"), "requiresWeight", Some(false))?,
            requires_dimensions: assert::boolean(
                fields.get("requiresDimensions"),
                "requiresDimensions",
                Some(false),
            )?,
        })
    }
}
