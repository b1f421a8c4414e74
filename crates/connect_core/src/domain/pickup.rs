//! Pickup scheduling and the `schedulePickup` capability.

use crate::capability::{CapabilityKind, Operation};
use crate::config::{PipelinePolicy, ResponseDefaults};
use crate::domain::charge::{total_charges, Charge};
use crate::domain::delivery_service::DeliveryService;
use crate::domain::measure::Quantity;
use crate::domain::money::MonetaryValue;
use crate::entity::{
    construct_list, resolve_field, serialize_ref, to_pojo, BuildContext, Entity, EntityError,
};
use crate::validation::assert;
use crate::validation::schema::{field, optional, Rule, Schema};
use crate::validation::violation::FieldPath;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

static PICKUP_SHIPMENT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "pickup shipment",
        Rule::object([
            field("trackingNumber", Rule::string()),
            optional("packageCount", Quantity::rule()),
        ]),
    )
});

/// A shipment to be collected.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupShipment {
    tracking_number: String,
    package_count: Quantity,
}

impl PickupShipment {
    pub fn tracking_number(&self) -> &str {
        &self.tracking_number
    }

    pub fn package_count(&self) -> Quantity {
        self.package_count
    }
}

impl Entity for PickupShipment {
    fn schema() -> &'static Schema {
        &PICKUP_SHIPMENT_SCHEMA
    }

    fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            tracking_number: assert::string(fields.get("trackingNumber"), "trackingNumber", None)?,
            package_count: Quantity::parse(fields.get("packageCount"), "packageCount")?,
        })
    }
}

/// Tracking numbers identify shipments, so a list of them is a set.
fn unique_shipments(
    label: &str,
    fields: &Map<String, Value>,
    cx: &mut BuildContext<'_>,
) -> Result<Vec<PickupShipment>, EntityError> {
    let shipments: Vec<PickupShipment> = construct_list(fields, "shipments", cx)?;
    for (index, shipment) in shipments.iter().enumerate() {
        if shipments[..index]
            .iter()
            .any(|earlier| earlier.tracking_number == shipment.tracking_number)
        {
            return Err(EntityError::rule(
                label,
                FieldPath::root()
                    .join("shipments")
                    .join(index)
                    .join("trackingNumber"),
                "must not contain duplicates",
            ));
        }
    }
    Ok(shipments)
}

static PICKUP_REQUEST_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "pickup request",
        Rule::object([
            field("deliveryService", Rule::Uuid),
            field(
                "shipments",
                Rule::array(PickupShipment::schema().rules().clone()).min_items(1),
            ),
            optional("notes", Rule::string()),
        ]),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupRequest {
    #[serde(serialize_with = "serialize_ref")]
    delivery_service: Arc<DeliveryService>,
    shipments: Vec<PickupShipment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl PickupRequest {
    pub fn delivery_service(&self) -> &Arc<DeliveryService> {
        &self.delivery_service
    }

    pub fn shipments(&self) -> &[PickupShipment] {
        &self.shipments
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Entity for PickupRequest {
    fn schema() -> &'static Schema {
        &PICKUP_REQUEST_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            delivery_service: resolve_field(fields, "deliveryService", cx)?,
            shipments: unique_shipments(Self::label(), fields, cx)?,
            notes: assert::optional_string(fields.get("notes"), "notes")?,
        })
    }
}

static PICKUP_CONFIRMATION_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "pickup confirmation",
        Rule::object([
            field("confirmationID", Rule::string()),
            optional("charges", Rule::array(Charge::schema().rules().clone())),
            field(
                "shipments",
                Rule::array(PickupShipment::schema().rules().clone()).min_items(1),
            ),
            optional("notes", Rule::string()),
        ]),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupConfirmation {
    #[serde(rename = "confirmationID")]
    confirmation_id: String,
    charges: Vec<Charge>,
    #[serde(skip)]
    total_amount: Option<MonetaryValue>,
    shipments: Vec<PickupShipment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl PickupConfirmation {
    pub fn confirmation_id(&self) -> &str {
        &self.confirmation_id
    }

    pub fn charges(&self) -> &[Charge] {
        &self.charges
    }

    /// Exact sum of the charges; `None` for a free pickup.
    pub fn total_amount(&self) -> Option<&MonetaryValue> {
        self.total_amount.as_ref()
    }

    pub fn shipments(&self) -> &[PickupShipment] {
        &self.shipments
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Entity for PickupConfirmation {
    fn schema() -> &'static Schema {
        &PICKUP_CONFIRMATION_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let charges: Vec<Charge> = construct_list(fields, "charges", cx)?;
        let total_amount = total_charges(&charges, cx.policy().zero_charge_currency)?;
        Ok(Self {
            confirmation_id: assert::string(fields.get("confirmationID"), "confirmationID", None)?,
            charges,
            total_amount,
            shipments: unique_shipments(Self::label(), fields, cx)?,
            notes: assert::optional_string(fields.get("notes"), "notes")?,
        })
    }
}

/// `schedulePickup`: schedule a package pickup.
#[derive(Debug, Clone, Copy)]
pub struct SchedulePickup;

impl Operation for SchedulePickup {
    const KIND: CapabilityKind = CapabilityKind::SchedulePickup;

    type Request = PickupRequest;
    type Response = PickupConfirmation;

    /// With lenient defaults omitted shipments are the requested ones.
    fn backfill(request: &PickupRequest, response: Value, policy: PipelinePolicy) -> Value {
        if policy.response_defaults != ResponseDefaults::Lenient {
            return response;
        }
        let Value::Object(mut fields) = response else {
            return response;
        };
        if fields.get("shipments").map_or(true, Value::is_null) {
            let shipments = request
                .shipments
                .iter()
                .map(to_pojo)
                .collect::<Result<Vec<_>, _>>();
            if let Ok(shipments) = shipments {
                fields.insert("shipments".to_string(), Value::Array(shipments));
            }
        }
        Value::Object(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::{PickupConfirmation, PickupRequest, SchedulePickup};
    use crate::capability::Operation;
    use crate::config::{PipelinePolicy, ResponseDefaults};
    use crate::domain::delivery_service::DeliveryService;
    use crate::entity::{construct, BuildContext};
    use crate::reference::ReferenceMap;
    use serde_json::json;

    const SERVICE_ID: &str = "88888888-8888-4888-8888-888888888888";

    fn loaded_refs() -> ReferenceMap {
        let mut refs = ReferenceMap::new("test");
        {
            let mut cx = BuildContext::loading(&mut refs, PipelinePolicy::default());
            cx.resolve::<DeliveryService>(&json!({
                "id": SERVICE_ID,
                "name": "Pickup",
                "code": "pickup",
                "class": "ground"
            }))
            .unwrap();
        }
        refs.finished_loading();
        refs
    }

    fn pickup_request(cx: &mut BuildContext<'_>) -> PickupRequest {
        construct::<PickupRequest>(
            &json!({
                "deliveryService": SERVICE_ID,
                "shipments": [
                    { "trackingNumber": "1Z001" },
                    { "trackingNumber": "1Z002", "packageCount": 3 }
                ]
            }),
            cx,
        )
        .unwrap()
    }

    #[test]
    fn lenient_backfill_copies_requested_shipments() {
        let refs = loaded_refs();
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let request = pickup_request(&mut cx);
        let backfilled = SchedulePickup::backfill(
            &request,
            json!({
                "confirmationID": "PU-1",
                "charges": [{ "type": "pickup", "amount": { "value": 4.5, "currency": "USD" } }]
            }),
            PipelinePolicy::default(),
        );
        let confirmation = construct::<PickupConfirmation>(&backfilled, &mut cx).unwrap();
        assert_eq!(confirmation.shipments().len(), 2);
        assert_eq!(confirmation.shipments()[1].package_count().value(), 3);
        assert_eq!(confirmation.total_amount().unwrap().value(), 4.5);
    }

    #[test]
    fn strict_backfill_requires_shipments() {
        let refs = loaded_refs();
        let strict = PipelinePolicy {
            response_defaults: ResponseDefaults::Strict,
            ..PipelinePolicy::default()
        };
        let mut cx = BuildContext::loaded(&refs, strict);
        let request = pickup_request(&mut cx);
        let backfilled =
            SchedulePickup::backfill(&request, json!({ "confirmationID": "PU-1" }), strict);
        let err = construct::<PickupConfirmation>(&backfilled, &mut cx).unwrap_err();
        assert!(err.to_string().contains("shipments is required"));
    }

    #[test]
    fn free_pickup_has_no_total() {
        let refs = loaded_refs();
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let confirmation = construct::<PickupConfirmation>(
            &json!({ "confirmationID": "PU-2", "shipments": [{ "trackingNumber": "1Z001" }] }),
            &mut cx,
        )
        .unwrap();
        assert!(confirmation.total_amount().is_none());
        assert!(confirmation.charges().is_empty());
    }

    #[test]
    fn repeated_tracking_numbers_are_rejected() {
        let refs = loaded_refs();
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let err = construct::<PickupRequest>(
            &json!({
                "deliveryService": SERVICE_ID,
                "shipments": [{ "trackingNumber": "1Z001" }, { "trackingNumber": "1Z001" }]
            }),
            &mut cx,
        )
        .unwrap_err();
        assert!(err.to_string().contains("shipments[1].trackingNumber must not contain duplicates"));
    }
}
