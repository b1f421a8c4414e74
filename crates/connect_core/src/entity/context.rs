use crate::config::PipelinePolicy;
use crate::entity::{construct, Entity, EntityError, Identifiable};
use crate::reference::ReferenceMap;
use crate::validation::assert;
use serde_json::Value;
use std::sync::Arc;

enum Refs<'a> {
    Loading(&'a mut ReferenceMap),
    Loaded(&'a ReferenceMap),
}

/// Construction-time environment: the aggregate's reference map and the
/// active pipeline policy.
///
/// While loading, inline identifiable fragments are registered as they are
/// built. Once loaded, the map is only read: ids returned by plugin code are
/// resolved against it and inline fragments are built transiently.
pub struct BuildContext<'a> {
    refs: Refs<'a>,
    policy: PipelinePolicy,
}

impl<'a> BuildContext<'a> {
    pub fn loading(refs: &'a mut ReferenceMap, policy: PipelinePolicy) -> Self {
        Self {
            refs: Refs::Loading(refs),
            policy,
        }
    }

    pub fn loaded(refs: &'a ReferenceMap, policy: PipelinePolicy) -> Self {
        Self {
            refs: Refs::Loaded(refs),
            policy,
        }
    }

    pub fn policy(&self) -> PipelinePolicy {
        self.policy
    }

    pub fn references(&self) -> &ReferenceMap {
        match &self.refs {
            Refs::Loading(refs) => &**refs,
            Refs::Loaded(refs) => *refs,
        }
    }

    /// Resolves an inline fragment or an id reference to one shared instance.
    ///
    /// - A UUID string must name an already-registered `T`.
    /// - A fragment seen before (same canonical content) returns the instance
    ///   built the first time.
    /// - A new fragment is built and, while loading, registered.
    pub fn resolve<T>(&mut self, value: &Value) -> Result<Arc<T>, EntityError>
    where
        T: Entity + Identifiable,
    {
        let label = T::label();
        if value.is_string() {
            let id = assert::reference_id(value, label)?;
            return Ok(self.references().lookup::<T>(id, label)?);
        }

        if let Some(existing) = self.references().get::<T>(value)? {
            return Ok(existing);
        }
        if let Refs::Loaded(refs) = &self.refs {
            if let Some(id) = value
                .get("id")
                .and_then(|raw| assert::check_uuid(raw).ok())
            {
                if let Some(known) = refs.get::<T>(id)? {
                    return Ok(known);
                }
            }
        }

        let instance = Arc::new(construct::<T>(value, self)?);
        if let Refs::Loading(refs) = &mut self.refs {
            refs.add(Arc::clone(&instance), value, label)?;
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::BuildContext;
    use crate::config::PipelinePolicy;
    use crate::entity::{resolve_field, Entity, EntityError, Identifiable};
    use crate::reference::{ReferenceErrorKind, ReferenceMap};
    use crate::validation::assert;
    use crate::validation::schema::{field, Rule, Schema};
    use once_cell::sync::Lazy;
    use serde::Serialize;
    use serde_json::{json, Map, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Debug, Serialize)]
    struct Tag {
        id: Uuid,
        name: String,
    }

    static TAG_SCHEMA: Lazy<Schema> = Lazy::new(|| {
        Schema::new(
            "tag",
            Rule::object([field("id", Rule::Uuid), field("name", Rule::string())]),
        )
    });

    impl Entity for Tag {
        fn schema() -> &'static Schema {
            &TAG_SCHEMA
        }

        fn build(fields: &Map<String, Value>, _cx: &mut BuildContext<'_>) -> Result<Self, EntityError> {
            Ok(Self {
                id: assert::uuid(fields.get("id"), "id")?,
                name: assert::string(fields.get("name"), "name", None)?,
            })
        }
    }

    impl Identifiable for Tag {
        fn id(&self) -> Uuid {
            self.id
        }
    }

    const TAG_ID: &str = "33333333-3333-4333-8333-333333333333";

    #[test]
    fn repeated_inline_fragment_resolves_to_one_instance() {
        let mut refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loading(&mut refs, PipelinePolicy::default());
        let fragment = json!({ "id": TAG_ID, "name": "fragile" });

        let first = cx.resolve::<Tag>(&fragment).unwrap();
        let again = cx.resolve::<Tag>(&fragment).unwrap();
        let by_id = cx.resolve::<Tag>(&json!(TAG_ID)).unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert!(Arc::ptr_eq(&first, &by_id));
    }

    #[test]
    fn unknown_id_reference_is_not_found() {
        let mut refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loading(&mut refs, PipelinePolicy::default());
        let err = cx.resolve::<Tag>(&json!(TAG_ID)).unwrap_err();
        assert!(matches!(err, EntityError::Reference(ref inner) if inner.kind == ReferenceErrorKind::NotFound));
    }

    #[test]
    fn malformed_id_reference_is_reported_at_the_reference_itself() {
        let mut refs = ReferenceMap::new("test");
        let mut cx = BuildContext::loading(&mut refs, PipelinePolicy::default());
        let err = cx.resolve::<Tag>(&json!("nope")).unwrap_err();
        let EntityError::Validation(violations) = &err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert!(violations.violations()[0].path.is_root());

        let err = resolve_field::<Tag>(
            json!({ "tag": "nope" }).as_object().unwrap(),
            "tag",
            &mut cx,
        )
        .unwrap_err();
        let EntityError::Validation(violations) = &err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(violations.violations()[0].path.to_string(), "tag");
        assert_eq!(violations.violations()[0].message, "must be a valid UUID");
    }

    #[test]
    fn loaded_context_builds_inline_fragments_without_registering() {
        let mut refs = ReferenceMap::new("test");
        refs.finished_loading();
        let mut cx = BuildContext::loaded(&refs, PipelinePolicy::default());
        let tag = cx
            .resolve::<Tag>(&json!({ "id": TAG_ID, "name": "transient" }))
            .unwrap();
        assert_eq!(tag.name, "transient");
        assert!(!refs.contains(tag.id));
    }
}
