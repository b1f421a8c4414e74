//! Per-invocation transaction envelope.

use crate::entity::{BuildContext, Entity, EntityError};
use crate::validation::assert;
use crate::validation::schema::{field, optional, Rule, Schema};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

static TRANSACTION_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new(
        "transaction",
        Rule::object([
            field("id", Rule::Uuid),
            optional("isSandbox", Rule::Bool),
            optional("session", Rule::object([]).open()),
        ]),
    )
});

/// Correlation id, sandbox flag and session bag of one invocation.
///
/// The session bag belongs to the invocation that received it; handlers get
/// their own copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: Uuid,
    is_sandbox: bool,
    session: Map<String, Value>,
}

impl Transaction {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            is_sandbox: false,
            session: Map::new(),
        }
    }

    pub fn sandbox(mut self) -> Self {
        self.is_sandbox = true;
        self
    }

    pub fn with_session(mut self, session: Map<String, Value>) -> Self {
        self.session = session;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_sandbox(&self) -> bool {
        self.is_sandbox
    }

    pub fn session(&self) -> &Map<String, Value> {
        &self.session
    }

    /// Wire form handed to `Capability::call`.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "isSandbox": self.is_sandbox,
            "session": self.session,
        })
    }
}

impl Entity for Transaction {
    fn schema() -> &'static Schema {
        &TRANSACTION_SCHEMA
    }

    fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
        let session = match fields.get("session") {
            Some(Value::Object(session)) => session.clone(),
            _ => Map::new(),
        };
        Ok(Self {
            id: assert::uuid(fields.get("id"), "id")?,
            is_sandbox: assert::boolean(fields.get("isSandbox"), "isSandbox", Some(false))?,
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Transaction;
    use crate::config::PipelinePolicy;
    use crate::entity::{construct, BuildContext, Entity};
    use crate::reference::ReferenceMap;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn defaults_sandbox_and_session() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let id = Uuid::new_v4();
        let txn = construct::<Transaction>(&json!({ "id": id.to_string() }), &mut cx).unwrap();
        assert_eq!(txn.id(), id);
        assert!(!txn.is_sandbox());
        assert!(txn.session().is_empty());
    }

    #[test]
    fn wire_form_round_trips() {
        let refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let mut session = serde_json::Map::new();
        session.insert("token".into(), json!("abc"));
        let txn = Transaction::new(Uuid::new_v4()).sandbox().with_session(session);
        let rebuilt = construct::<Transaction>(&txn.to_value(), &mut cx).unwrap();
        assert_eq!(rebuilt, txn);
    }

    #[test]
    fn reports_every_envelope_defect() {
        let err = Transaction::schema()
            .validate(&json!({ "isSandbox": "yes", "session": [] }))
            .unwrap_err();
        assert_eq!(err.len(), 3);
    }
}
