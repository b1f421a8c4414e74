use crate::domain::money::CurrencyMismatchError;
use crate::reference::ReferenceError;
use crate::validation::violation::{FieldPath, ValidationError, Violation};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Entity construction failure.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityError {
    Validation(ValidationError),
    Reference(ReferenceError),
    CurrencyMismatch(CurrencyMismatchError),
}

impl EntityError {
    /// Single business-rule violation on `path` of the entity `label`.
    pub fn rule(label: &str, path: FieldPath, message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::single(label, Violation::new(path, message)))
    }

    /// Relabels validation failures; other variants pass through.
    pub fn relabel(self, label: impl Into<String>) -> Self {
        match self {
            Self::Validation(err) => Self::Validation(err.relabel(label)),
            other => other,
        }
    }

    /// Re-roots validation paths under `prefix`; other variants pass through.
    pub fn at(self, prefix: &FieldPath) -> Self {
        match self {
            Self::Validation(err) => Self::Validation(err.under(prefix)),
            other => other,
        }
    }
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Reference(err) => write!(f, "{err}"),
            Self::CurrencyMismatch(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EntityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Reference(err) => Some(err),
            Self::CurrencyMismatch(err) => Some(err),
        }
    }
}

impl From<ValidationError> for EntityError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<ReferenceError> for EntityError {
    fn from(value: ReferenceError) -> Self {
        Self::Reference(value)
    }
}

impl From<CurrencyMismatchError> for EntityError {
    fn from(value: CurrencyMismatchError) -> Self {
        Self::CurrencyMismatch(value)
    }
}
