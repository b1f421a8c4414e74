//! Rate quotes and the `rateShipment` capability.
//!
//! # Invariants
//! - A rate's minimum delivery days never exceed its maximum.
//! - A rate's total is the exact sum of its charges, in one currency.

use crate::capability::{CapabilityKind, Operation};
use crate::config::PipelinePolicy;
use crate::domain::charge::{total_charges, Charge};
use crate::domain::delivery_service::DeliveryService;
use crate::domain::measure::{Quantity, Weight};
use crate::domain::money::MonetaryValue;
use crate::domain::packaging::Packaging;
use crate::entity::{
    construct_field, construct_list, construct_optional_field, resolve_field, resolve_list,
    resolve_optional_field, serialize_ref, serialize_refs, BuildContext, Entity, EntityError,
    Identifiable,
};
use crate::validation::assert;
use crate::validation::schema::{field, optional, Rule, Schema};
use crate::validation::violation::FieldPath;
use once_cell::sync::Lazy;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use std::sync::Arc;

const TOTAL_TOLERANCE: f64 = 1e-9;

static RATE_PACKAGE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "rate package",
        Rule::object([
            optional("packaging", Rule::Uuid),
            field("weight", Weight::schema().rules().clone()),
            optional("quantity", Quantity::rule()),
        ]),
    )
});

/// One package of a prospective shipment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatePackage {
    #[serde(
        serialize_with = "serialize_optional_ref",
        skip_serializing_if = "Option::is_none"
    )]
    packaging: Option<Arc<Packaging>>,
    weight: Weight,
    quantity: Quantity,
}

impl RatePackage {
    pub fn packaging(&self) -> Option<&Arc<Packaging>> {
        self.packaging.as_ref()
    }

    pub fn weight(&self) -> &Weight {
        &self.weight
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }
}

impl Entity for RatePackage {
    fn schema() -> &'static Schema {
        &RATE_PACKAGE_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            packaging: resolve_optional_field(fields, "packaging", cx)?,
            weight: construct_field(fields, "weight", cx)?,
            quantity: Quantity::parse(fields.get("quantity"), "quantity")?,
        })
    }
}

static RATE_CRITERIA_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "rate criteria",
        Rule::object([
            optional("deliveryServices", Rule::array(Rule::Uuid).unique()),
            field(
                "packages",
                Rule::array(RatePackage::schema().rules().clone()).min_items(1),
            ),
        ]),
    )
});

/// What the host wants quoted. An empty service list means every service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateCriteria {
    #[serde(serialize_with = "serialize_refs")]
    delivery_services: Vec<Arc<DeliveryService>>,
    packages: Vec<RatePackage>,
}

impl RateCriteria {
    pub fn delivery_services(&self) -> &[Arc<DeliveryService>] {
        &self.delivery_services
    }

    pub fn packages(&self) -> &[RatePackage] {
        &self.packages
    }
}

impl Entity for RateCriteria {
    fn schema() -> &'static Schema {
        &RATE_CRITERIA_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            delivery_services: resolve_list(fields, "deliveryServices", cx)?,
            packages: construct_list(fields, "packages", cx)?,
        })
    }
}

static RATE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "rate",
        Rule::object([
            field(
                "deliveryService",
                Rule::inline_or_id(DeliveryService::schema().rules().clone()),
            ),
            optional("minimumDeliveryDays", Rule::integer().non_negative()),
            optional("maximumDeliveryDays", Rule::integer().non_negative()),
            optional("isGuaranteed", Rule::Bool),
            optional("isTrackable", Rule::Bool),
            field(
                "charges",
                Rule::array(Charge::schema().rules().clone()).min_items(1),
            ),
            optional("totalAmount", MonetaryValue::schema().rules().clone()),
            optional("notes", Rule::array(Rule::string())),
        ]),
    )
});

/// A quoted price for one delivery service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    #[serde(serialize_with = "serialize_ref")]
    delivery_service: Arc<DeliveryService>,
    #[serde(skip_serializing_if = "Option::is_none")]
    minimum_delivery_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maximum_delivery_days: Option<u32>,
    is_guaranteed: bool,
    is_trackable: bool,
    charges: Vec<Charge>,
    total_amount: MonetaryValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    notes: Vec<String>,
}

impl Rate {
    pub fn delivery_service(&self) -> &Arc<DeliveryService> {
        &self.delivery_service
    }

    pub fn minimum_delivery_days(&self) -> Option<u32> {
        self.minimum_delivery_days
    }

    pub fn maximum_delivery_days(&self) -> Option<u32> {
        self.maximum_delivery_days
    }

    pub fn is_guaranteed(&self) -> bool {
        self.is_guaranteed
    }

    pub fn is_trackable(&self) -> bool {
        self.is_trackable
    }

    pub fn charges(&self) -> &[Charge] {
        &self.charges
    }

    /// Exact sum of the itemized charges.
    pub fn total_amount(&self) -> &MonetaryValue {
        &self.total_amount
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}

impl Entity for Rate {
    fn schema() -> &'static Schema {
        &RATE_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let label = Self::label();
        let minimum_delivery_days =
            assert::optional_count(fields.get("minimumDeliveryDays"), "minimumDeliveryDays")?;
        let maximum_delivery_days =
            assert::optional_count(fields.get("maximumDeliveryDays"), "maximumDeliveryDays")?;
        if let (Some(min), Some(max)) = (minimum_delivery_days, maximum_delivery_days) {
            if min > max {
                return Err(EntityError::rule(
                    label,
                    FieldPath::root().join("minimumDeliveryDays"),
                    format!("must not exceed maximumDeliveryDays ({min} > {max})"),
                ));
            }
        }

        let charges: Vec<Charge> = construct_list(fields, "charges", cx)?;
        let total_amount = total_charges(&charges, cx.policy().zero_charge_currency)?
            .ok_or_else(|| {
                EntityError::rule(
                    label,
                    FieldPath::root().join("charges"),
                    "must contain at least 1 item",
                )
            })?;
        let declared: Option<MonetaryValue> = construct_optional_field(fields, "totalAmount", cx)?;
        if let Some(declared) = declared {
            let matches = declared.currency() == total_amount.currency()
                && (declared.value() - total_amount.value()).abs() < TOTAL_TOLERANCE;
            if !matches {
                return Err(EntityError::rule(
                    label,
                    FieldPath::root().join("totalAmount"),
                    format!("must equal the sum of charges ({total_amount})"),
                ));
            }
        }

        let notes = match fields.get("notes") {
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(index, note)| assert::string(Some(note), &format!("notes[{index}]"), None))
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            delivery_service: resolve_field(fields, "deliveryService", cx)?,
            minimum_delivery_days,
            maximum_delivery_days,
            is_guaranteed: assert::boolean(fields.get("isGuaranteed"), "isGuaranteed", Some(false))?,
            is_trackable: assert::boolean(fields.get("isTrackable"), "isTrackable", Some(false))?,
            charges,
            total_amount,
            notes,
        })
    }
}

static RATE_LIST_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "rates",
        Rule::object([field("rates", Rule::array(Rate::schema().rules().clone()))]),
    )
});

/// Rates quoted for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateList {
    rates: Vec<Rate>,
}

impl RateList {
    pub fn rates(&self) -> &[Rate] {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl Entity for RateList {
    fn schema() -> &'static Schema {
        &RATE_LIST_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            rates: construct_list(fields, "rates", cx)?,
        })
    }
}

/// `rateShipment`: quote rates for a prospective shipment.
#[derive(Debug, Clone, Copy)]
pub struct RateShipment;

impl Operation for RateShipment {
    const KIND: CapabilityKind = CapabilityKind::RateShipment;

    type Request = RateCriteria;
    type Response = RateList;

    /// Handlers usually return a bare list of rates.
    fn backfill(_request: &RateCriteria, response: Value, _policy: PipelinePolicy) -> Value {
        match response {
            Value::Array(rates) => json!({ "rates": rates }),
            other => other,
        }
    }
}

fn serialize_optional_ref<T, S>(value: &Option<Arc<T>>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Identifiable,
    S: Serializer,
{
    match value {
        Some(value) => serialize_ref(value, serializer),
        None => serializer.serialize_none(),
    }
}
