//! App aggregate: a validated definition plus its capability table.
//!
//! # Responsibility
//! - Build the app definition once, populating and sealing its reference map.
//! - Register at most one handler per capability.
//! - Expose implemented capabilities to the host, typed or as JSON.
//!
//! # Invariants
//! - A capability without a handler is absent, never a stub.
//! - The reference map is sealed before the app is handed out and is only
//!   read afterwards.

use crate::capability::handler::Handler;
use crate::capability::invoke::{invoke, transaction_id_of, CapabilityError, InvocationStage};
use crate::capability::kind::CapabilityKind;
use crate::capability::operation::Operation;
use crate::config::{ConnectConfig, PipelinePolicy};
use crate::entity::{construct, to_pojo, BuildContext, Entity, Identifiable};
use crate::error::ConfigurationError;
use crate::locale::{LocaleError, LocaleTag};
use crate::reference::ReferenceMap;
use futures_util::future::{BoxFuture, FutureExt};
use log::{error, info};
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Root entity of an app (a carrier, a sales channel, ...).
pub trait AppDefinition: Entity + Identifiable + Clone {
    fn name(&self) -> &str;

    /// The definition as seen from `locale`, nested entities included.
    fn localize(&self, locale: &str) -> Result<Self, LocaleError>;
}

trait ErasedCapability: Send + Sync {
    fn invoke_json<'a>(
        &'a self,
        refs: &'a ReferenceMap,
        policy: PipelinePolicy,
        transaction: &'a Value,
        request: &'a Value,
    ) -> BoxFuture<'a, Result<Value, CapabilityError>>;

    fn as_any(&self) -> &dyn Any;
}

struct Registered<Op: Operation> {
    handler: Handler<Op::Request>,
}

impl<Op: Operation> ErasedCapability for Registered<Op> {
    fn invoke_json<'a>(
        &'a self,
        refs: &'a ReferenceMap,
        policy: PipelinePolicy,
        transaction: &'a Value,
        request: &'a Value,
    ) -> BoxFuture<'a, Result<Value, CapabilityError>> {
        async move {
            let response = invoke::<Op>(&self.handler, refs, policy, transaction, request).await?;
            to_pojo(&response).map_err(|err| {
                CapabilityError::app_error(
                    Op::KIND,
                    InvocationStage::ValidatingOutput,
                    transaction_id_of(transaction).unwrap_or_else(Uuid::nil),
                    "response could not be rendered",
                    Some(Box::new(err)),
                )
            })
        }
        .boxed()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Typed entry point for one implemented capability.
pub struct Capability<Op: Operation> {
    handler: Handler<Op::Request>,
    refs: Arc<ReferenceMap>,
    policy: PipelinePolicy,
    _operation: PhantomData<fn() -> Op>,
}

impl<Op: Operation> Clone for Capability<Op> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            refs: Arc::clone(&self.refs),
            policy: self.policy,
            _operation: PhantomData,
        }
    }
}

impl<Op: Operation> Capability<Op> {
    pub fn kind(&self) -> CapabilityKind {
        Op::KIND
    }

    /// Validates `transaction` and `request`, runs the handler and returns
    /// the validated response.
    pub async fn call(
        &self,
        transaction: &Value,
        request: &Value,
    ) -> Result<Op::Response, CapabilityError> {
        invoke::<Op>(&self.handler, &self.refs, self.policy, transaction, request).await
    }
}

/// Host-facing summary of an app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppManifest {
    pub id: Uuid,
    pub name: String,
    pub capabilities: Vec<&'static str>,
}

/// A loaded app: sealed definition, policy and capability table.
pub struct App<D: AppDefinition> {
    definition: Arc<D>,
    refs: Arc<ReferenceMap>,
    policy: PipelinePolicy,
    default_locale: LocaleTag,
    capabilities: BTreeMap<CapabilityKind, Arc<dyn ErasedCapability>>,
}

impl<D: AppDefinition> Debug for App<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("id", &self.definition.id())
            .field("references", &self.refs)
            .field("policy", &self.policy)
            .field("capabilities", &self.capabilities.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<D: AppDefinition> App<D> {
    pub fn builder(definition: Value) -> AppBuilder<D> {
        AppBuilder::new(definition)
    }

    pub fn definition(&self) -> &Arc<D> {
        &self.definition
    }

    pub fn references(&self) -> &Arc<ReferenceMap> {
        &self.refs
    }

    pub fn policy(&self) -> PipelinePolicy {
        self.policy
    }

    pub fn supports(&self, kind: CapabilityKind) -> bool {
        self.capabilities.contains_key(&kind)
    }

    /// Implemented capabilities in catalogue order.
    pub fn capabilities(&self) -> Vec<CapabilityKind> {
        self.capabilities.keys().copied().collect()
    }

    /// Typed handle for `Op`, or `None` when the app does not implement it.
    pub fn operation<Op: Operation>(&self) -> Option<Capability<Op>> {
        let registered = self
            .capabilities
            .get(&Op::KIND)?
            .as_any()
            .downcast_ref::<Registered<Op>>()?;
        Some(Capability {
            handler: registered.handler.clone(),
            refs: Arc::clone(&self.refs),
            policy: self.policy,
            _operation: PhantomData,
        })
    }

    /// Invokes `kind` with raw payloads and renders the response as JSON.
    ///
    /// Returns `None` when the app does not implement `kind`.
    pub async fn invoke_json(
        &self,
        kind: CapabilityKind,
        transaction: &Value,
        request: &Value,
    ) -> Option<Result<Value, CapabilityError>> {
        let capability = self.capabilities.get(&kind)?;
        Some(
            capability
                .invoke_json(&self.refs, self.policy, transaction, request)
                .await,
        )
    }

    pub fn manifest(&self) -> AppManifest {
        AppManifest {
            id: self.definition.id(),
            name: self.definition.name().to_string(),
            capabilities: self
                .capabilities
                .keys()
                .map(|kind| kind.as_str())
                .collect(),
        }
    }

    /// The definition as seen from `locale`, or from the configured default
    /// locale when none is given.
    pub fn localized_definition(&self, locale: Option<&str>) -> Result<D, LocaleError> {
        self.definition
            .localize(locale.unwrap_or(self.default_locale.as_str()))
    }
}

/// Collects the definition, policy and handlers of an app.
pub struct AppBuilder<D> {
    definition: Value,
    policy: PipelinePolicy,
    default_locale: LocaleTag,
    capabilities: BTreeMap<CapabilityKind, Arc<dyn ErasedCapability>>,
    duplicates: Vec<CapabilityKind>,
    _definition: PhantomData<fn() -> D>,
}

impl<D: AppDefinition> AppBuilder<D> {
    fn new(definition: Value) -> Self {
        Self {
            definition,
            policy: PipelinePolicy::default(),
            default_locale: LocaleTag::default(),
            capabilities: BTreeMap::new(),
            duplicates: Vec::new(),
            _definition: PhantomData,
        }
    }

    /// Applies the policy and default locale of `config`.
    pub fn config(mut self, config: &ConnectConfig) -> Self {
        self.policy = config.policy;
        self.default_locale = config.default_locale.clone();
        self
    }

    pub fn policy(mut self, policy: PipelinePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Implements `Op` with `handler`. Registering one capability twice fails
    /// the build.
    pub fn capability<Op: Operation>(mut self, handler: Handler<Op::Request>) -> Self {
        if self.capabilities.contains_key(&Op::KIND) {
            self.duplicates.push(Op::KIND);
            return self;
        }
        self.capabilities
            .insert(Op::KIND, Arc::new(Registered::<Op> { handler }));
        self
    }

    /// Constructs the definition, seals its references and returns the app.
    pub fn build(self) -> Result<App<D>, ConfigurationError> {
        if let Some(kind) = self.duplicates.first() {
            error!(
                "event=aggregate_load module=capability status=error reason=duplicate_capability capability={}",
                kind
            );
            return Err(ConfigurationError::DuplicateCapability(*kind));
        }

        let mut refs = ReferenceMap::new(D::label());
        let definition = {
            let mut cx = BuildContext::loading(&mut refs, self.policy);
            construct::<D>(&self.definition, &mut cx)
        };
        // The root shares the id space of everything it owns.
        let definition = definition.map(Arc::new).and_then(|definition| {
            refs.add(Arc::clone(&definition), &self.definition, D::label())?;
            Ok(definition)
        });
        let definition = definition.map_err(|source| {
            error!(
                "event=aggregate_load module=capability status=error reason=invalid_definition label={}",
                D::label()
            );
            ConfigurationError::Definition {
                label: D::label(),
                source,
            }
        })?;
        refs.finished_loading();

        info!(
            "event=aggregate_load module=capability status=ok label={} id={} references={} capabilities={}",
            D::label(),
            definition.id(),
            refs.len(),
            self.capabilities.len()
        );
        Ok(App {
            definition,
            refs: Arc::new(refs),
            policy: self.policy,
            default_locale: self.default_locale,
            capabilities: self.capabilities,
        })
    }
}
