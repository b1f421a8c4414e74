//! Dual-index reference map owned by one aggregate.

use crate::reference::fragment::FragmentKey;
use crate::validation::assert::check_uuid;
use log::{debug, info};
use serde_json::Value;
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Lookup key: a UUID or an inline fragment.
#[derive(Debug, Clone, Copy)]
pub enum RefKey<'a> {
    Id(Uuid),
    Fragment(&'a Value),
}

impl From<Uuid> for RefKey<'_> {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl<'a> From<&'a Value> for RefKey<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Fragment(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceErrorKind {
    /// No instance is registered under the id.
    NotFound,
    /// The id or fragment is already registered.
    Duplicate,
    /// The id belongs to an instance of another type.
    TypeCollision,
    /// The fragment has no valid `id`.
    InvalidId,
    /// The map no longer accepts registrations.
    Sealed,
}

/// Reference resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceError {
    pub kind: ReferenceErrorKind,
    pub id: Option<Uuid>,
    pub message: String,
}

impl ReferenceError {
    fn new(kind: ReferenceErrorKind, id: Option<Uuid>, message: String) -> Self {
        Self { kind, id, message }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ReferenceErrorKind::NotFound
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(
            self.kind,
            ReferenceErrorKind::Duplicate | ReferenceErrorKind::TypeCollision
        )
    }
}

impl Display for ReferenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ReferenceError {}

struct Entry {
    label: String,
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

/// Id and fragment indices for one aggregate.
pub struct ReferenceMap {
    owner: String,
    by_id: HashMap<Uuid, Entry>,
    by_fragment: Option<HashMap<FragmentKey, Uuid>>,
}

impl ReferenceMap {
    /// Creates an empty map in loading state for the aggregate `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            by_id: HashMap::new(),
            by_fragment: Some(HashMap::new()),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Whether the fragment index is still available.
    pub fn is_loading(&self) -> bool {
        self.by_fragment.is_some()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Registers `instance` as the constructed form of `fragment`.
    ///
    /// # Errors
    /// - `InvalidId` when `fragment.id` is missing or not a UUID.
    /// - `Duplicate` when the id or the fragment is already registered.
    /// - `Sealed` after `finished_loading`.
    pub fn add<T>(
        &mut self,
        instance: Arc<T>,
        fragment: &Value,
        label: &str,
    ) -> Result<Uuid, ReferenceError>
    where
        T: Any + Send + Sync,
    {
        let Some(fragments) = self.by_fragment.as_mut() else {
            return Err(ReferenceError::new(
                ReferenceErrorKind::Sealed,
                None,
                format!(
                    "cannot register {label}: {} has finished loading",
                    self.owner
                ),
            ));
        };

        let id = fragment
            .get("id")
            .and_then(|raw| check_uuid(raw).ok())
            .ok_or_else(|| {
                ReferenceError::new(
                    ReferenceErrorKind::InvalidId,
                    None,
                    format!("{label} must have a valid UUID `id`"),
                )
            })?;

        let key = FragmentKey::of(fragment);
        if let Some(existing) = self.by_id.get(&id) {
            return Err(ReferenceError::new(
                ReferenceErrorKind::Duplicate,
                Some(id),
                format!(
                    "duplicate UUID {id}: {label} reuses the id of {}",
                    existing.label
                ),
            ));
        }
        if fragments.contains_key(&key) {
            return Err(ReferenceError::new(
                ReferenceErrorKind::Duplicate,
                Some(id),
                format!("duplicate {label} fragment: {key}"),
            ));
        }

        fragments.insert(key, id);
        self.by_id.insert(
            id,
            Entry {
                label: label.to_string(),
                type_name: type_name::<T>(),
                instance,
            },
        );
        debug!(
            "event=reference_add module=reference status=ok owner={} label={} id={}",
            self.owner, label, id
        );
        Ok(id)
    }

    /// Resolves a fragment or an id to an instance of `T`.
    ///
    /// Returns `Ok(None)` when nothing is registered (fragment lookups always
    /// miss once loading finished). A registered instance of another type is
    /// a `TypeCollision` error, never a silent miss.
    pub fn get<'a, T>(&self, key: impl Into<RefKey<'a>>) -> Result<Option<Arc<T>>, ReferenceError>
    where
        T: Any + Send + Sync,
    {
        let id = match key.into() {
            RefKey::Id(id) => id,
            RefKey::Fragment(fragment) => {
                let Some(fragments) = &self.by_fragment else {
                    return Ok(None);
                };
                match fragments.get(&FragmentKey::of(fragment)) {
                    Some(id) => *id,
                    None => return Ok(None),
                }
            }
        };

        let Some(entry) = self.by_id.get(&id) else {
            return Ok(None);
        };
        match Arc::clone(&entry.instance).downcast::<T>() {
            Ok(instance) => Ok(Some(instance)),
            Err(_) => Err(ReferenceError::new(
                ReferenceErrorKind::TypeCollision,
                Some(id),
                format!(
                    "UUID collision: {id} refers to a {} ({}), expected {}",
                    entry.label,
                    short_type_name(entry.type_name),
                    short_type_name(type_name::<T>())
                ),
            )),
        }
    }

    /// Resolves `id` to an instance of `T`, failing when it is unknown.
    pub fn lookup<T>(&self, id: Uuid, label: &str) -> Result<Arc<T>, ReferenceError>
    where
        T: Any + Send + Sync,
    {
        self.get::<T>(id)?.ok_or_else(|| {
            ReferenceError::new(
                ReferenceErrorKind::NotFound,
                Some(id),
                format!("{label} {id} not found in {}", self.owner),
            )
        })
    }

    /// Releases the fragment index and seals the map.
    ///
    /// Id lookups keep working for the rest of the aggregate's lifetime.
    pub fn finished_loading(&mut self) {
        if let Some(fragments) = self.by_fragment.take() {
            info!(
                "event=reference_sealed module=reference status=ok owner={} ids={} fragments_released={}",
                self.owner,
                self.by_id.len(),
                fragments.len()
            );
        }
    }
}

impl Debug for ReferenceMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceMap")
            .field("owner", &self.owner)
            .field("ids", &self.by_id.len())
            .field("loading", &self.is_loading())
            .finish()
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
