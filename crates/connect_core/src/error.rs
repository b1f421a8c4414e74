//! Crate-level error surface.
//!
//! # Responsibility
//! - Give every public error a stable machine-readable code.
//! - Offer one umbrella type for hosts that mix configuration loading, app
//!   construction and invocation behind `?`.

use crate::capability::{CapabilityError, CapabilityErrorKind, CapabilityKind};
use crate::domain::money::CurrencyMismatchError;
use crate::entity::EntityError;
use crate::locale::LocaleError;
use crate::reference::{ReferenceError, ReferenceErrorKind};
use crate::validation::violation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable error code exposed to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Validation,
    InvalidInput,
    AppError,
    CurrencyMismatch,
    ReferenceNotFound,
    ReferenceDuplicate,
    Configuration,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::InvalidInput => "INVALID_INPUT",
            Self::AppError => "APP_ERROR",
            Self::CurrencyMismatch => "CURRENCY_MISMATCH",
            Self::ReferenceNotFound => "REFERENCE_NOT_FOUND",
            Self::ReferenceDuplicate => "REFERENCE_DUPLICATE",
            Self::Configuration => "CONFIGURATION",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ValidationError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Validation
    }
}

impl CurrencyMismatchError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::CurrencyMismatch
    }
}

impl ReferenceError {
    pub fn code(&self) -> ErrorCode {
        match self.kind {
            ReferenceErrorKind::NotFound => ErrorCode::ReferenceNotFound,
            ReferenceErrorKind::Duplicate | ReferenceErrorKind::TypeCollision => {
                ErrorCode::ReferenceDuplicate
            }
            ReferenceErrorKind::InvalidId => ErrorCode::Validation,
            ReferenceErrorKind::Sealed => ErrorCode::Configuration,
        }
    }
}

impl EntityError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(err) => err.code(),
            Self::Reference(err) => err.code(),
            Self::CurrencyMismatch(err) => err.code(),
        }
    }
}

impl LocaleError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Validation
    }
}

impl CapabilityError {
    pub fn code(&self) -> ErrorCode {
        match self.kind() {
            CapabilityErrorKind::InvalidInput => ErrorCode::InvalidInput,
            CapabilityErrorKind::AppError => ErrorCode::AppError,
        }
    }
}

/// App construction failure; always fatal to the aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The definition failed validation or reference resolution.
    Definition {
        label: &'static str,
        source: EntityError,
    },
    /// A handler was registered twice for one capability.
    DuplicateCapability(CapabilityKind),
}

impl ConfigurationError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Configuration
    }
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definition { label, source } => write!(f, "invalid {label} definition: {source}"),
            Self::DuplicateCapability(kind) => {
                write!(f, "capability registered more than once: {kind}")
            }
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Definition { source, .. } => Some(source),
            Self::DuplicateCapability(_) => None,
        }
    }
}

/// Any error produced by this crate.
#[derive(Debug)]
pub enum ConnectError {
    Validation(ValidationError),
    Entity(EntityError),
    Locale(LocaleError),
    Configuration(ConfigurationError),
    Capability(CapabilityError),
}

pub type ConnectResult<T> = Result<T, ConnectError>;

impl ConnectError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(err) => err.code(),
            Self::Entity(err) => err.code(),
            Self::Locale(err) => err.code(),
            Self::Configuration(err) => err.code(),
            Self::Capability(err) => err.code(),
        }
    }
}

impl Display for ConnectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Entity(err) => write!(f, "{err}"),
            Self::Locale(err) => write!(f, "{err}"),
            Self::Configuration(err) => write!(f, "{err}"),
            Self::Capability(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConnectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Entity(err) => Some(err),
            Self::Locale(err) => Some(err),
            Self::Configuration(err) => Some(err),
            Self::Capability(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ConnectError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<EntityError> for ConnectError {
    fn from(value: EntityError) -> Self {
        Self::Entity(value)
    }
}

impl From<LocaleError> for ConnectError {
    fn from(value: LocaleError) -> Self {
        Self::Locale(value)
    }
}

impl From<ConfigurationError> for ConnectError {
    fn from(value: ConfigurationError) -> Self {
        Self::Configuration(value)
    }
}

impl From<CapabilityError> for ConnectError {
    fn from(value: CapabilityError) -> Self {
        Self::Capability(value)
    }
}
