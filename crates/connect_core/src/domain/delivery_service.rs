//! Delivery services and their packaging.

use crate::domain::packaging::Packaging;
use crate::domain::text::{DisplayText, LocalizedText};
use crate::entity::{resolve_list, serialize_refs, BuildContext, Entity, EntityError, Identifiable};
use crate::locale::{LocaleError, LocaleOverlays};
use crate::validation::assert::{self, StringEnum};
use crate::validation::pattern::SERVICE_CODE;
use crate::validation::schema::{field, optional, Rule, Schema};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Speed class of a delivery service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceClass {
    Ground,
    OneDay,
    TwoDay,
    ThreeDay,
}

impl StringEnum for ServiceClass {
    const VARIANTS: &'static [Self] = &[Self::Ground, Self::OneDay, Self::TwoDay, Self::ThreeDay];

    fn as_str(self) -> &'static str {
        match self {
            Self::Ground => "ground",
            Self::OneDay => "one_day",
            Self::TwoDay => "two_day",
            Self::ThreeDay => "three_day",
        }
    }
}

static DELIVERY_SERVICE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "delivery service",
        Rule::object([
            field("id", Rule::Uuid),
            field("name", Rule::string()),
            optional("description", Rule::string()),
            field("code", Rule::string().pattern(&SERVICE_CODE)),
            field("class", Rule::enumeration(ServiceClass::wire_names())),
            optional("isInternational", Rule::Bool),
            optional(
                "packaging",
                Rule::array(Rule::inline_or_id(Packaging::schema().rules().clone())).unique(),
            ),
            optional("localization", LocaleOverlays::rule(DisplayText::overlay_rule())),
        ]),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryService {
    id: Uuid,
    #[serde(flatten)]
    text: LocalizedText,
    code: String,
    class: ServiceClass,
    is_international: bool,
    #[serde(serialize_with = "serialize_refs")]
    packaging: Vec<Arc<Packaging>>,
}

impl DeliveryService {
    pub fn name(&self) -> &str {
        self.text.name()
    }

    pub fn description(&self) -> Option<&str> {
        self.text.description()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn class(&self) -> ServiceClass {
        self.class
    }

    pub fn is_international(&self) -> bool {
        self.is_international
    }

    pub fn packaging(&self) -> &[Arc<Packaging>] {
        &self.packaging
    }

    /// Localizes the service text; shared packaging stays untouched.
    pub fn localize(&self, locale: &str) -> Result<Self, LocaleError> {
        Ok(Self {
            text: self.text.localize(locale)?,
            ..self.clone()
        })
    }
}

impl Identifiable for DeliveryService {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for DeliveryService {
    fn schema() -> &'static Schema {
        &DELIVERY_SERVICE_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            id: assert::uuid(fields.get("id"), "id")?,
            text: LocalizedText::from_fields(fields)?,
            code: assert::matches(fields.get("code"), "code", &SERVICE_CODE)?,
            class: assert::enum_value(fields.get("class"), "class", None)?,
            is_international: assert::boolean(
                fields.get("isInternational"),
                "isInternational",
                Some(false),
            )?,
            packaging: resolve_list(fields, "packaging", cx)?,
        })
    }
}
