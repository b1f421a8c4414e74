//! Validation primitives and schema descriptors.
//!
//! # Responsibility
//! - Turn untrusted JSON input into checked values.
//! - Offer two modes: `assert` (one field, first failure) and `schema` (whole
//!   value, every failure).
//!
//! # Invariants
//! - Schema mode never stops at the first violation.
//! - Every violation carries the path of the offending value.

pub mod assert;
pub mod pattern;
pub mod schema;
pub mod violation;

pub use assert::{Sign, StringEnum, ValueKind};
pub use pattern::Pattern;
pub use schema::{field, optional, Rule, Schema};
pub use violation::{
    FieldPath, PathSegment, ValidationError, ValidationResult, Violation, Violations,
};
