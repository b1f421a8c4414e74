//! Typed request/response contract of one capability.

use crate::capability::kind::CapabilityKind;
use crate::config::PipelinePolicy;
use crate::entity::{Entity, EntityError};
use serde_json::Value;

/// A capability's request and response entities.
///
/// Implemented by marker types (`RateShipment`, `CancelShipments`, ...) so the
/// host addresses capabilities by type: `app.operation::<RateShipment>()`.
pub trait Operation: Send + Sync + 'static {
    const KIND: CapabilityKind;

    type Request: Entity;
    type Response: Entity;

    /// Normalizes and fills omitted fields of a raw handler response before
    /// it is validated.
    ///
    /// The default leaves the response untouched.
    fn backfill(_request: &Self::Request, response: Value, _policy: PipelinePolicy) -> Value {
        response
    }

    /// Cross-checks a constructed response against the request it answers.
    ///
    /// The default accepts every response.
    fn check_response(
        _request: &Self::Request,
        _response: &Self::Response,
    ) -> Result<(), EntityError> {
        Ok(())
    }
}
