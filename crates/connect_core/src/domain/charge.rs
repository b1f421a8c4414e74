//! Itemized charges.

use crate::config::ZeroChargeCurrency;
use crate::domain::money::{CurrencyMismatchError, MonetaryValue};
use crate::entity::{construct_field, BuildContext, Entity, EntityError};
use crate::validation::assert::{self, StringEnum};
use crate::validation::schema::{field, optional, Rule, Schema};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};

/// Category of an itemized charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    Shipping,
    DeliveryConfirmation,
    Insurance,
    FuelSurcharge,
    Oversize,
    Pickup,
    Tax,
    Duty,
    Fee,
    Other,
}

impl StringEnum for ChargeKind {
    const VARIANTS: &'static [Self] = &[
        Self::Shipping,
        Self::DeliveryConfirmation,
        Self::Insurance,
        Self::FuelSurcharge,
        Self::Oversize,
        Self::Pickup,
        Self::Tax,
        Self::Duty,
        Self::Fee,
        Self::Other,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::DeliveryConfirmation => "delivery_confirmation",
            Self::Insurance => "insurance",
            Self::FuelSurcharge => "fuel_surcharge",
            Self::Oversize => "oversize",
            Self::Pickup => "pickup",
            Self::Tax => "tax",
            Self::Duty => "duty",
            Self::Fee => "fee",
            Self::Other => "other",
        }
    }
}

static CHARGE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "charge",
        Rule::object([
            optional("name", Rule::string()),
            field("type", Rule::enumeration(ChargeKind::wire_names())),
            field("amount", MonetaryValue::schema().rules().clone()),
        ]),
    )
});

/// One line of a price breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Charge {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: ChargeKind,
    amount: MonetaryValue,
}

impl Charge {
    pub fn new(kind: ChargeKind, amount: MonetaryValue) -> Self {
        Self {
            name: None,
            kind,
            amount,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> ChargeKind {
        self.kind
    }

    pub fn amount(&self) -> &MonetaryValue {
        &self.amount
    }
}

impl Entity for Charge {
    fn schema() -> &'static Schema {
        &CHARGE_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            name: assert::optional_string(fields.get("name"), "name")?,
            kind: assert::enum_value(fields.get("type"), "type", None)?,
            amount: construct_field(fields, "amount", cx)?,
        })
    }
}

/// Exact total of `charges`; `None` when there are none.
pub fn total_charges(
    charges: &[Charge],
    zero_charges: ZeroChargeCurrency,
) -> Result<Option<MonetaryValue>, CurrencyMismatchError> {
    MonetaryValue::sum(charges.iter().map(Charge::amount), zero_charges)
}
