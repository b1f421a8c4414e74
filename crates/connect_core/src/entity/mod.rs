//! Entity construction convention.
//!
//! # Responsibility
//! - Turn a raw JSON payload into an immutable typed value: schema check
//!   first (every violation), then the entity's own constructor.
//! - Link inline fragments and id references through the owning aggregate's
//!   reference map.
//!
//! # Invariants
//! - Entities expose getters only; nothing mutates a value after `build`.
//! - An entity's schema is a process-wide static, built once.
//! - Business-rule failures discovered by `build` are reported with the path
//!   of the offending field.

mod context;
mod error;

pub use context::BuildContext;
pub use error::EntityError;

use crate::validation::schema::Schema;
use crate::validation::violation::FieldPath;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// A typed domain value with a declarative contract.
pub trait Entity: Serialize + Sized + Send + Sync + 'static {
    /// Structural contract shared by every instance.
    fn schema() -> &'static Schema;

    /// Builds the value from a payload that already passed `schema()`.
    fn build(fields: &Map<String, Value>, cx: &mut BuildContext<'_>) -> Result<Self, EntityError>;

    fn label() -> &'static str {
        Self::schema().label()
    }
}

/// Entities addressable by a stable UUID.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Validates `pojo` against `T`'s schema and builds it.
pub fn construct<T: Entity>(pojo: &Value, cx: &mut BuildContext<'_>) -> Result<T, EntityError> {
    let fields = T::schema().validate_object(pojo)?;
    T::build(fields, cx)
}

/// Like [`construct`], re-rooting violations under `path`.
pub fn construct_at<T: Entity>(
    pojo: &Value,
    path: &FieldPath,
    cx: &mut BuildContext<'_>,
) -> Result<T, EntityError> {
    construct(pojo, cx).map_err(|err| err.at(path))
}

/// Builds the nested entity stored in field `name`.
pub fn construct_field<T: Entity>(
    fields: &Map<String, Value>,
    name: &'static str,
    cx: &mut BuildContext<'_>,
) -> Result<T, EntityError> {
    let value = fields.get(name).unwrap_or(&Value::Null);
    construct_at(value, &FieldPath::root().join(name), cx)
}

/// Builds the nested entity stored in field `name` when present.
pub fn construct_optional_field<T: Entity>(
    fields: &Map<String, Value>,
    name: &'static str,
    cx: &mut BuildContext<'_>,
) -> Result<Option<T>, EntityError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => construct_at(value, &FieldPath::root().join(name), cx).map(Some),
    }
}

/// Resolves the inline-or-id reference stored in field `name`.
pub fn resolve_field<T: Entity + Identifiable>(
    fields: &Map<String, Value>,
    name: &'static str,
    cx: &mut BuildContext<'_>,
) -> Result<Arc<T>, EntityError> {
    let value = fields.get(name).unwrap_or(&Value::Null);
    cx.resolve::<T>(value)
        .map_err(|err| err.at(&FieldPath::root().join(name)))
}

/// Resolves the inline-or-id reference stored in field `name` when present.
pub fn resolve_optional_field<T: Entity + Identifiable>(
    fields: &Map<String, Value>,
    name: &'static str,
    cx: &mut BuildContext<'_>,
) -> Result<Option<Arc<T>>, EntityError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => resolve_field(fields, name, cx).map(Some),
    }
}

/// Builds every item of the array field `name`, in order.
pub fn construct_list<T: Entity>(
    fields: &Map<String, Value>,
    name: &'static str,
    cx: &mut BuildContext<'_>,
) -> Result<Vec<T>, EntityError> {
    let Some(Value::Array(items)) = fields.get(name) else {
        return Ok(Vec::new());
    };
    let base = FieldPath::root().join(name);
    items
        .iter()
        .enumerate()
        .map(|(index, item)| construct_at(item, &base.join(index), cx))
        .collect()
}

/// Resolves every item of the array field `name` as an inline-or-id
/// reference.
pub fn resolve_list<T: Entity + Identifiable>(
    fields: &Map<String, Value>,
    name: &'static str,
    cx: &mut BuildContext<'_>,
) -> Result<Vec<Arc<T>>, EntityError> {
    let Some(Value::Array(items)) = fields.get(name) else {
        return Ok(Vec::new());
    };
    let base = FieldPath::root().join(name);
    items
        .iter()
        .enumerate()
        .map(|(index, item)| cx.resolve::<T>(item).map_err(|err| err.at(&base.join(index))))
        .collect()
}

/// Renders an entity back into its wire form.
pub fn to_pojo<T: Entity>(entity: &T) -> serde_json::Result<Value> {
    serde_json::to_value(entity)
}

/// Serializes a referenced entity as its id.
pub fn serialize_ref<T, S>(value: &Arc<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Identifiable,
    S: serde::Serializer,
{
    value.id().serialize(serializer)
}

/// Serializes a list of referenced entities as their ids.
pub fn serialize_refs<T, S>(values: &[Arc<T>], serializer: S) -> Result<S::Ok, S::Error>
where
    T: Identifiable,
    S: serde::Serializer,
{
    serializer.collect_seq(values.iter().map(|value| value.id()))
}
