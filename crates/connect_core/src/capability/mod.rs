//! Capability invocation: catalogue, handlers, pipeline and app aggregate.

mod app;
mod handler;
mod invoke;
mod kind;
mod operation;
mod transaction;

pub use app::{App, AppBuilder, AppDefinition, AppManifest, Capability};
pub use handler::{Handler, HandlerError};
pub use invoke::{CapabilityError, CapabilityErrorKind, InvocationStage};
pub use kind::{supported_capability_strings, CapabilityKind, CapabilityKindError};
pub use operation::Operation;
pub use transaction::Transaction;
