//! Carrier definition: the aggregate root of a carrier app.

use crate::capability::AppDefinition;
use crate::domain::delivery_service::DeliveryService;
use crate::domain::packaging::Packaging;
use crate::domain::text::{DisplayText, LocalizedText};
use crate::entity::{resolve_list, serialize_refs, BuildContext, Entity, EntityError, Identifiable};
use crate::locale::{LocaleError, LocaleOverlays};
use crate::validation::assert;
use crate::validation::pattern::HTTP_URL;
use crate::validation::schema::{field, optional, Rule, Schema};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

static CARRIER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "carrier",
        Rule::object([
            field("id", Rule::Uuid),
            field("name", Rule::string()),
            optional("description", Rule::string()),
            optional("websiteURL", Rule::string().pattern(&HTTP_URL)),
            optional(
                "packaging",
                Rule::array(Rule::inline_or_id(Packaging::schema().rules().clone())).unique(),
            ),
            field(
                "deliveryServices",
                Rule::array(Rule::inline_or_id(
                    DeliveryService::schema().rules().clone(),
                ))
                .min_items(1)
                .unique(),
            ),
            optional("localization", LocaleOverlays::rule(DisplayText::overlay_rule())),
        ]),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Carrier {
    id: Uuid,
    #[serde(flatten)]
    text: LocalizedText,
    #[serde(rename = "websiteURL", skip_serializing_if = "Option::is_none")]
    website_url: Option<String>,
    #[serde(serialize_with = "serialize_refs")]
    packaging: Vec<Arc<Packaging>>,
    #[serde(serialize_with = "serialize_refs")]
    delivery_services: Vec<Arc<DeliveryService>>,
}

impl Carrier {
    pub fn name(&self) -> &str {
        self.text.name()
    }

    pub fn description(&self) -> Option<&str> {
        self.text.description()
    }

    pub fn website_url(&self) -> Option<&str> {
        self.website_url.as_deref()
    }

    pub fn packaging(&self) -> &[Arc<Packaging>] {
        &self.packaging
    }

    pub fn delivery_services(&self) -> &[Arc<DeliveryService>] {
        &self.delivery_services
    }

    /// Localizes the carrier and every entity it lists.
    pub fn localize(&self, locale: &str) -> Result<Self, LocaleError> {
        Ok(Self {
            id: self.id,
            text: self.text.localize(locale)?,
            website_url: self.website_url.clone(),
            packaging: self
                .packaging
                .iter()
                .map(|packaging| packaging.localize(locale).map(Arc::new))
                .collect::<Result<_, _>>()?,
            delivery_services: self
                .delivery_services
                .iter()
                .map(|service| service.localize(locale).map(Arc::new))
                .collect::<Result<_, _>>()?,
        })
    }
}

impl Identifiable for Carrier {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Entity for Carrier {
    fn schema() -> &'static Schema {
        &CARRIER_SCHEMA
    }

    /// Packaging is resolved before delivery services so services may refer
    /// to carrier packaging by id.
    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let website_url = match fields.get("websiteURL") {
            None | Some(Value::Null) => None,
            raw => Some(assert::matches(raw, "websiteURL", &HTTP_URL)?),
        };
        let packaging = resolve_list(fields, "packaging", cx)?;
        let delivery_services = resolve_list(fields, "deliveryServices", cx)?;
        Ok(Self {
            id: assert::uuid(fields.get("id"), "id")?,
            text: LocalizedText::from_fields(fields)?,
            website_url,
            packaging,
            delivery_services,
        })
    }
}

impl AppDefinition for Carrier {
    fn name(&self) -> &str {
        self.text.name()
    }

    fn localize(&self, locale: &str) -> Result<Self, LocaleError> {
        Carrier::localize(self, locale)
    }
}
