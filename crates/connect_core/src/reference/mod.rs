//! Per-aggregate reference resolution.
//!
//! # Responsibility
//! - Map stable UUIDs and inline fragment identities to constructed instances.
//! - Detect duplicate ids and id collisions across unrelated entity kinds.
//!
//! # Invariants
//! - One id maps to exactly one instance of exactly one type.
//! - The fragment index lives only while the owning aggregate is loading.
//! - After `finished_loading` the map is read-only and safe to share.

mod fragment;
mod map;

pub use fragment::FragmentKey;
pub use map::{RefKey, ReferenceError, ReferenceErrorKind, ReferenceMap};
