//! Contract validation and capability invocation for shipping-integration
//! apps.
//! This crate is the single source of truth for the data contract between a
//! host and plugin code: every payload crossing that boundary is validated
//! here.

pub mod capability;
pub mod config;
pub mod domain;
pub mod entity;
pub mod error;
pub mod locale;
pub mod logging;
pub mod reference;
pub mod validation;

pub use capability::{
    App, AppBuilder, AppDefinition, AppManifest, Capability, CapabilityError, CapabilityErrorKind,
    CapabilityKind, Handler, HandlerError, InvocationStage, Operation, Transaction,
};
pub use config::{ConnectConfig, PipelinePolicy, ResponseDefaults, ZeroChargeCurrency};
pub use entity::{construct, to_pojo, BuildContext, Entity, EntityError, Identifiable};
pub use error::{ConfigurationError, ConnectError, ConnectResult, ErrorCode};
pub use locale::{LocaleError, LocaleOverlays, LocaleTag, Localized};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use reference::{ReferenceError, ReferenceErrorKind, ReferenceMap};
pub use validation::{Rule, Schema, ValidationError, Violation};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
