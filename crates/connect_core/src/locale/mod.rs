//! Locale overlay resolution.
//!
//! # Responsibility
//! - Validate locale tags.
//! - Merge a base record with per-locale partial overrides, field by field,
//!   along a language fallback chain.
//!
//! # Invariants
//! - Resolving a locale with no overlay data is value-equal to the base.
//! - A field missing from one locale still inherits from broader locales.

mod resolver;
mod tag;

pub use resolver::{FieldOverlay, LocaleError, LocaleOverlays, Localized};
pub use tag::{InvalidLocaleTag, LocaleTag};
