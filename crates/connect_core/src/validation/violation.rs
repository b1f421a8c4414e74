//! Violation records and the aggregated validation error.
//!
//! # Invariants
//! - A `ValidationError` always holds at least one violation.
//! - Violations keep discovery order; paths are never re-sorted.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// One segment of a violation path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(value: &str) -> Self {
        Self::Field(value.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(value: String) -> Self {
        Self::Field(value)
    }
}

impl From<usize> for PathSegment {
    fn from(value: usize) -> Self {
        Self::Index(value)
    }
}

/// Ordered field/index path from the validated root to the offending value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<PathSegment>> FromIterator<S> for FieldPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for segment in &self.0 {
            match segment {
                PathSegment::Field(name) if first => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
            first = false;
        }
        Ok(())
    }
}

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: FieldPath,
    pub message: String,
    /// Optional detail such as the offending value or the expected example.
    pub context: Option<String>,
}

impl Violation {
    pub fn new(path: FieldPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl Display for Violation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.message)?;
        } else {
            write!(f, "{} {}", self.path, self.message)?;
        }
        if let Some(context) = &self.context {
            write!(f, " ({context})")?;
        }
        Ok(())
    }
}

/// Collector used while walking a value; turns into a `ValidationError` when
/// anything was recorded.
#[derive(Debug, Default)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: Violation) {
        self.0.push(violation);
    }

    pub fn report(&mut self, path: &FieldPath, message: impl Into<String>) {
        self.0.push(Violation::new(path.clone(), message));
    }

    /// Absorbs violations of a nested error, re-rooting them under `prefix`.
    pub fn absorb(&mut self, prefix: &FieldPath, error: ValidationError) {
        self.0.extend(error.under(prefix).violations);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Finishes collection for the value labelled `label`.
    pub fn finish(self, label: impl Into<String>) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            return Ok(());
        }
        Err(ValidationError {
            label: label.into(),
            violations: self.0,
        })
    }
}

/// Aggregated failure of one validated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    label: String,
    violations: Vec<Violation>,
}

pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    /// Builds an error carrying exactly one violation (assert mode).
    pub fn single(label: impl Into<String>, violation: Violation) -> Self {
        Self {
            label: label.into(),
            violations: vec![violation],
        }
    }

    /// Human label of the validated value, e.g. `rate` or `transaction`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Replaces the label, keeping the violations.
    pub fn relabel(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Re-roots every violation path under `prefix`.
    pub fn under(mut self, prefix: &FieldPath) -> Self {
        if prefix.is_root() {
            return self;
        }
        for violation in &mut self.violations {
            let mut segments = prefix.0.clone();
            segments.append(&mut violation.path.0);
            violation.path = FieldPath(segments);
        }
        self
    }

    /// Merges two errors, keeping the receiver's label.
    pub fn merge(mut self, other: ValidationError) -> Self {
        self.violations.extend(other.violations);
        self
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let [only] = self.violations.as_slice() {
            return write!(f, "Invalid {}: {only}", self.label);
        }
        write!(f, "Invalid {}:", self.label)?;
        for violation in &self.violations {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}

impl Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::{FieldPath, Violation, Violations};

    #[test]
    fn renders_dotted_and_indexed_paths() {
        let path = FieldPath::root()
            .join("packages")
            .join(2usize)
            .join("weight");
        assert_eq!(path.to_string(), "packages[2].weight");
    }

    #[test]
    fn absorb_reroots_nested_violations() {
        let mut inner = Violations::new();
        inner.report(&FieldPath::root().join("value"), "must be positive");
        let nested = inner.finish("weight").unwrap_err();

        let mut outer = Violations::new();
        outer.absorb(&FieldPath::root().join("packages").join(0usize), nested);
        let err = outer.finish("rate criteria").unwrap_err();
        assert_eq!(err.violations()[0].path.to_string(), "packages[0].value");
    }

    #[test]
    fn message_lists_every_violation() {
        let mut violations = Violations::new();
        violations.report(&FieldPath::root().join("name"), "is required");
        violations.push(
            Violation::new(FieldPath::root().join("code"), "must match pattern")
                .with_context("example: ABC"),
        );
        let err = violations.finish("delivery service").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Invalid delivery service:"));
        assert!(message.contains("\n  name is required"));
        assert!(message.contains("\n  code must match pattern (example: ABC)"));
    }

    #[test]
    fn empty_collector_finishes_ok() {
        assert!(Violations::new().finish("anything").is_ok());
    }
}
