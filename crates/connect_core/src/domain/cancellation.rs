//! Shipment cancellation and the `cancelShipments` capability.

use crate::capability::{CapabilityKind, Operation};
use crate::config::{PipelinePolicy, ResponseDefaults};
use crate::entity::{construct_list, BuildContext, Entity, EntityError};
use crate::validation::assert::{self, StringEnum};
use crate::validation::schema::{field, optional, Rule, Schema};
use crate::validation::violation::FieldPath;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

static SHIPMENT_CANCELLATION_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "shipment cancellation",
        Rule::object([
            field("cancellationID", Rule::Uuid),
            field("trackingNumber", Rule::string()),
            optional("metadata", Rule::object([]).open()),
        ]),
    )
});

/// One shipment the host wants cancelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentCancellation {
    #[serde(rename = "cancellationID")]
    cancellation_id: Uuid,
    tracking_number: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    metadata: Map<String, Value>,
}

impl ShipmentCancellation {
    pub fn cancellation_id(&self) -> Uuid {
        self.cancellation_id
    }

    pub fn tracking_number(&self) -> &str {
        &self.tracking_number
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }
}

impl Entity for ShipmentCancellation {
    fn schema() -> &'static Schema {
        &SHIPMENT_CANCELLATION_SCHEMA
    }

    fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let metadata = match fields.get("metadata") {
            Some(Value::Object(metadata)) => metadata.clone(),
            _ => Map::new(),
        };
        Ok(Self {
            cancellation_id: assert::uuid(fields.get("cancellationID"), "cancellationID")?,
            tracking_number: assert::string(fields.get("trackingNumber"), "trackingNumber", None)?,
            metadata,
        })
    }
}

static CANCELLATION_REQUEST_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "cancellation request",
        Rule::object([field(
            "cancellations",
            Rule::array(ShipmentCancellation::schema().rules().clone()).min_items(1),
        )]),
    )
});

/// Shipments to cancel in one call; cancellation ids are unique.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationRequest {
    cancellations: Vec<ShipmentCancellation>,
}

impl CancellationRequest {
    pub fn cancellations(&self) -> &[ShipmentCancellation] {
        &self.cancellations
    }
}

impl Entity for CancellationRequest {
    fn schema() -> &'static Schema {
        &CANCELLATION_REQUEST_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let cancellations: Vec<ShipmentCancellation> = construct_list(fields, "cancellations", cx)?;
        for (index, cancellation) in cancellations.iter().enumerate() {
            let repeated = cancellations[..index]
                .iter()
                .any(|earlier| earlier.cancellation_id == cancellation.cancellation_id);
            if repeated {
                return Err(EntityError::rule(
                    Self::label(),
                    FieldPath::root()
                        .join("cancellations")
                        .join(index)
                        .join("cancellationID"),
                    "must not contain duplicates",
                ));
            }
        }
        Ok(Self { cancellations })
    }
}

/// Result of one cancellation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationStatus {
    Success,
    Error,
    Timeout,
    Skip,
}

impl StringEnum for CancellationStatus {
    const VARIANTS: &'static [Self] = &[Self::Success, Self::Error, Self::Timeout, Self::Skip];

    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::Skip => "skip",
        }
    }
}

static CANCELLATION_OUTCOME_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "cancellation outcome",
        Rule::object([
            field("cancellationID", Rule::Uuid),
            field("status", Rule::enumeration(CancellationStatus::wire_names())),
            optional("confirmationNumber", Rule::string()),
            optional("notes", Rule::string()),
        ]),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationOutcome {
    #[serde(rename = "cancellationID")]
    cancellation_id: Uuid,
    status: CancellationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmation_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl CancellationOutcome {
    pub fn cancellation_id(&self) -> Uuid {
        self.cancellation_id
    }

    pub fn status(&self) -> CancellationStatus {
        self.status
    }

    pub fn confirmation_number(&self) -> Option<&str> {
        self.confirmation_number.as_deref()
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}

impl Entity for CancellationOutcome {
    fn schema() -> &'static Schema {
        &CANCELLATION_OUTCOME_SCHEMA
    }

    fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        Ok(Self {
            cancellation_id: assert::uuid(fields.get("cancellationID"), "cancellationID")?,
            status: assert::enum_value(fields.get("status"), "status", None)?,
            confirmation_number: assert::optional_string(
                fields.get("confirmationNumber"),
                "confirmationNumber",
            )?,
            notes: assert::optional_string(fields.get("notes"), "notes")?,
        })
    }
}

static CANCELLATION_OUTCOMES_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "cancellation outcomes",
        Rule::object([field(
            "outcomes",
            Rule::array(CancellationOutcome::schema().rules().clone()),
        )]),
    )
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CancellationOutcomes {
    outcomes: Vec<CancellationOutcome>,
}

impl CancellationOutcomes {
    pub fn outcomes(&self) -> &[CancellationOutcome] {
        &self.outcomes
    }

    pub fn get(&self, cancellation_id: Uuid) -> Option<&CancellationOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.cancellation_id == cancellation_id)
    }
}

impl Entity for CancellationOutcomes {
    fn schema() -> &'static Schema {
        &CANCELLATION_OUTCOMES_SCHEMA
    }

    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let outcomes: Vec<CancellationOutcome> = construct_list(fields, "outcomes", cx)?;
        for (index, outcome) in outcomes.iter().enumerate() {
            let repeated = outcomes[..index]
                .iter()
                .any(|earlier| earlier.cancellation_id == outcome.cancellation_id);
            if repeated {
                return Err(EntityError::rule(
                    Self::label(),
                    outcome_id_path(index),
                    "must not contain duplicates",
                ));
            }
        }
        Ok(Self { outcomes })
    }
}

fn outcome_id_path(index: usize) -> FieldPath {
    FieldPath::root()
        .join("outcomes")
        .join(index)
        .join("cancellationID")
}

/// `cancelShipments`: cancel previously created shipments.
#[derive(Debug, Clone, Copy)]
pub struct CancelShipments;

impl Operation for CancelShipments {
    const KIND: CapabilityKind = CapabilityKind::CancelShipments;

    type Request = CancellationRequest;
    type Response = CancellationOutcomes;

    /// A bare list is wrapped. With lenient defaults a missing response,
    /// missing outcome or missing status means the cancellation succeeded.
    fn backfill(request: &CancellationRequest, response: Value, policy: PipelinePolicy) -> Value {
        let lenient = policy.response_defaults == ResponseDefaults::Lenient;
        let mut outcomes = match response {
            Value::Array(outcomes) => outcomes,
            Value::Null if lenient => Vec::new(),
            Value::Object(mut wrapper) if lenient => match wrapper.remove("outcomes") {
                Some(Value::Array(outcomes)) => outcomes,
                None | Some(Value::Null) => Vec::new(),
                Some(other) => {
                    wrapper.insert("outcomes".to_string(), other);
                    return Value::Object(wrapper);
                }
            },
            other => return other,
        };
        if !lenient {
            return json!({ "outcomes": outcomes });
        }

        for outcome in &mut outcomes {
            if let Value::Object(fields) = outcome {
                if fields.get("status").map_or(true, Value::is_null) {
                    fields.insert(
                        "status".to_string(),
                        json!(CancellationStatus::Success.as_str()),
                    );
                }
            }
        }
        for cancellation in &request.cancellations {
            let id = cancellation.cancellation_id.to_string();
            let reported = outcomes.iter().any(|outcome| {
                outcome.get("cancellationID").and_then(Value::as_str) == Some(id.as_str())
            });
            if !reported {
                outcomes.push(json!({
                    "cancellationID": id,
                    "status": CancellationStatus::Success.as_str(),
                }));
            }
        }
        json!({ "outcomes": outcomes })
    }

    /// Every outcome must answer a cancellation that was requested.
    fn check_response(
        request: &CancellationRequest,
        response: &CancellationOutcomes,
    ) -> Result<(), EntityError> {
        for (index, outcome) in response.outcomes.iter().enumerate() {
            let requested = request
                .cancellations
                .iter()
                .any(|cancellation| cancellation.cancellation_id == outcome.cancellation_id);
            if !requested {
                return Err(EntityError::rule(
                    CancellationOutcomes::label(),
                    outcome_id_path(index),
                    "was not requested",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelShipments, CancellationOutcomes, CancellationRequest, CancellationStatus};
    use crate::capability::Operation;
    use crate::config::{PipelinePolicy, ResponseDefaults};
    use crate::entity::{construct, BuildContext};
    use crate::reference::ReferenceMap;
    use serde_json::{json, Value};
    use uuid::Uuid;

    const FIRST: &str = "66666666-6666-4666-8666-666666666666";
    const SECOND: &str = "77777777-7777-4777-8777-777777777777";

    fn request(cx: &mut BuildContext<'_>) -> CancellationRequest {
        construct::<CancellationRequest>(
            &json!({
                "cancellations": [
                    { "cancellationID": FIRST, "trackingNumber": "1Z001" },
                    { "cancellationID": SECOND, "trackingNumber": "1Z002" }
                ]
            }),
            cx,
        )
        .unwrap()
    }

    #[test]
    fn duplicate_cancellation_ids_are_rejected() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let err = construct::<CancellationRequest>(
            &json!({
                "cancellations": [
                    { "cancellationID": FIRST, "trackingNumber": "1Z001" },
                    { "cancellationID": FIRST, "trackingNumber": "1Z002" }
                ]
            }),
            &mut cx,
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("cancellations[1].cancellationID must not contain duplicates"));
    }

    #[test]
    fn lenient_backfill_reports_omitted_cancellations_as_successful() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let request = request(&mut cx);
        let backfilled = CancelShipments::backfill(
            &request,
            json!([{ "cancellationID": FIRST, "status": "error", "notes": "already shipped" }]),
            PipelinePolicy::default(),
        );
        let outcomes = construct::<CancellationOutcomes>(&backfilled, &mut cx).unwrap();
        let first = outcomes.get(Uuid::parse_str(FIRST).unwrap()).unwrap();
        assert_eq!(first.status(), CancellationStatus::Error);
        let second = outcomes.get(Uuid::parse_str(SECOND).unwrap()).unwrap();
        assert_eq!(second.status(), CancellationStatus::Success);
    }

    #[test]
    fn lenient_backfill_accepts_an_empty_response() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let request = request(&mut cx);
        let backfilled = CancelShipments::backfill(&request, Value::Null, PipelinePolicy::default());
        let outcomes = construct::<CancellationOutcomes>(&backfilled, &mut cx).unwrap();
        assert_eq!(outcomes.outcomes().len(), 2);
    }

    #[test]
    fn strict_backfill_leaves_omissions_to_validation() {
        let refs = ReferenceMap::new("test");
        let strict = PipelinePolicy {
            response_defaults: ResponseDefaults::Strict,
            ..PipelinePolicy::default()
        };
        let mut cx = BuildContext::loaded(&refs, strict);
        let request = request(&mut cx);
        let backfilled = CancelShipments::backfill(&request, Value::Null, strict);
        assert!(construct::<CancellationOutcomes>(&backfilled, &mut cx).is_err());

        let backfilled =
            CancelShipments::backfill(&request, json!([{ "cancellationID": FIRST }]), strict);
        let err = construct::<CancellationOutcomes>(&backfilled, &mut cx).unwrap_err();
        assert!(err.to_string().contains("outcomes[0].status is required"));
    }

    #[test]
    fn repeated_outcomes_are_rejected() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let err = construct::<CancellationOutcomes>(
            &json!({
                "outcomes": [
                    { "cancellationID": FIRST, "status": "success" },
                    { "cancellationID": FIRST, "status": "error" }
                ]
            }),
            &mut cx,
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("outcomes[1].cancellationID must not contain duplicates"));
    }

    #[test]
    fn outcomes_for_unrequested_cancellations_fail_the_response_check() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let request = request(&mut cx);
        let outcomes = construct::<CancellationOutcomes>(
            &json!({
                "outcomes": [
                    { "cancellationID": FIRST, "status": "success" },
                    { "cancellationID": "88888888-8888-4888-8888-888888888888", "status": "success" }
                ]
            }),
            &mut cx,
        )
        .unwrap();
        let err = CancelShipments::check_response(&request, &outcomes).unwrap_err();
        assert!(err
            .to_string()
            .contains("outcomes[1].cancellationID was not requested"));
    }
}
