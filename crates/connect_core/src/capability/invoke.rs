//! Two-phase invocation pipeline around plugin handlers.
//!
//! # Responsibility
//! - Validate the transaction and request before plugin code runs.
//! - Run the plugin handler, containing its errors and panics.
//! - Backfill, validate and construct the response.
//!
//! # Invariants
//! - The handler is never called when input validation fails.
//! - Failures before the handler runs are `InvalidInput`; failures during or
//!   after it are `AppError` and carry the transaction id.
//! - Request, response and session payloads are never logged.

use crate::capability::handler::{Handler, HandlerError};
use crate::capability::kind::CapabilityKind;
use crate::capability::operation::Operation;
use crate::capability::transaction::Transaction;
use crate::config::PipelinePolicy;
use crate::entity::{construct, BuildContext, Entity, EntityError};
use crate::logging::panic_payload_summary;
use crate::reference::ReferenceMap;
use crate::validation::violation::{FieldPath, ValidationError};
use futures_util::FutureExt;
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Pipeline stage an invocation failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStage {
    ValidatingInput,
    Invoking,
    ValidatingOutput,
}

impl InvocationStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidatingInput => "validating_input",
            Self::Invoking => "invoking",
            Self::ValidatingOutput => "validating_output",
        }
    }
}

impl Display for InvocationStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which side of the contract was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityErrorKind {
    /// The host supplied a malformed transaction or request.
    InvalidInput,
    /// Plugin code failed or returned a malformed response.
    AppError,
}

/// Failure of one capability invocation.
#[derive(Debug)]
pub struct CapabilityError {
    kind: CapabilityErrorKind,
    capability: CapabilityKind,
    stage: InvocationStage,
    transaction_id: Option<Uuid>,
    message: String,
    source: Option<HandlerError>,
}

impl CapabilityError {
    fn invalid_input(
        capability: CapabilityKind,
        transaction_id: Option<Uuid>,
        source: HandlerError,
    ) -> Self {
        Self {
            kind: CapabilityErrorKind::InvalidInput,
            capability,
            stage: InvocationStage::ValidatingInput,
            transaction_id,
            message: format!("{capability} rejected its input: {source}"),
            source: Some(source),
        }
    }

    pub(crate) fn app_error(
        capability: CapabilityKind,
        stage: InvocationStage,
        transaction_id: Uuid,
        summary: &str,
        source: Option<HandlerError>,
    ) -> Self {
        let message = match &source {
            Some(source) => format!(
                "{capability} failed in transaction {transaction_id}: {summary}: {source}"
            ),
            None => format!("{capability} failed in transaction {transaction_id}: {summary}"),
        };
        Self {
            kind: CapabilityErrorKind::AppError,
            capability,
            stage,
            transaction_id: Some(transaction_id),
            message,
            source,
        }
    }

    pub fn kind(&self) -> CapabilityErrorKind {
        self.kind
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind == CapabilityErrorKind::InvalidInput
    }

    pub fn is_app_error(&self) -> bool {
        self.kind == CapabilityErrorKind::AppError
    }

    pub fn capability(&self) -> CapabilityKind {
        self.capability
    }

    pub fn stage(&self) -> InvocationStage {
        self.stage
    }

    /// Always present for `AppError`; present for `InvalidInput` once the
    /// transaction envelope itself was valid.
    pub fn transaction_id(&self) -> Option<Uuid> {
        self.transaction_id
    }

    /// Validation details when the failure was a contract violation.
    pub fn validation(&self) -> Option<&ValidationError> {
        let source = self.source.as_deref()?;
        if let Some(err) = source.downcast_ref::<ValidationError>() {
            return Some(err);
        }
        match source.downcast_ref::<EntityError>() {
            Some(EntityError::Validation(err)) => Some(err),
            _ => None,
        }
    }
}

impl Display for CapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CapabilityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

/// Runs one invocation of `Op` end to end.
pub(crate) async fn invoke<Op: Operation>(
    handler: &Handler<Op::Request>,
    refs: &ReferenceMap,
    policy: PipelinePolicy,
    transaction: &Value,
    request: &Value,
) -> Result<Op::Response, CapabilityError> {
    let capability = Op::KIND;
    let (transaction, request) = validate_input::<Op>(refs, policy, transaction, request)?;
    let transaction_id = transaction.id();
    let request = Arc::new(request);

    info!(
        "event=capability_invoke module=capability status=start capability={} transaction_id={} sandbox={}",
        capability,
        transaction_id,
        transaction.is_sandbox()
    );
    let started = Instant::now();

    let outcome = AssertUnwindSafe(handler.call(transaction, Arc::clone(&request)))
        .catch_unwind()
        .await;
    let raw = match outcome {
        Ok(Ok(raw)) => raw,
        Ok(Err(source)) => {
            let err = CapabilityError::app_error(
                capability,
                InvocationStage::Invoking,
                transaction_id,
                "handler returned an error",
                Some(source),
            );
            log_failure(&err, started);
            return Err(err);
        }
        Err(payload) => {
            let summary = format!("handler panicked: {}", panic_payload_summary(payload.as_ref()));
            let err = CapabilityError::app_error(
                capability,
                InvocationStage::Invoking,
                transaction_id,
                &summary,
                None,
            );
            log_failure(&err, started);
            return Err(err);
        }
    };

    let backfilled = Op::backfill(&request, raw, policy);
    let mut cx = BuildContext::loaded(refs, policy);
    let checked = construct::<Op::Response>(&backfilled, &mut cx)
        .and_then(|response| Op::check_response(&request, &response).map(|()| response));
    match checked {
        Ok(response) => {
            info!(
                "event=capability_invoke module=capability status=ok capability={} transaction_id={} duration_ms={}",
                capability,
                transaction_id,
                started.elapsed().as_millis()
            );
            Ok(response)
        }
        Err(source) => {
            let err = CapabilityError::app_error(
                capability,
                InvocationStage::ValidatingOutput,
                transaction_id,
                "handler returned an invalid response",
                Some(Box::new(source.relabel(response_label::<Op>()))),
            );
            log_failure(&err, started);
            Err(err)
        }
    }
}

fn validate_input<Op: Operation>(
    refs: &ReferenceMap,
    policy: PipelinePolicy,
    transaction: &Value,
    request: &Value,
) -> Result<(Transaction, Op::Request), CapabilityError> {
    let capability = Op::KIND;
    let transaction_check = Transaction::schema()
        .validate(transaction)
        .map_err(|err| err.under(&FieldPath::root().join("transaction")));
    let request_check = Op::Request::schema()
        .validate(request)
        .map_err(|err| err.under(&FieldPath::root().join("request")));

    let transaction_valid = transaction_check.is_ok();
    let violations = match (transaction_check, request_check) {
        (Ok(()), Ok(())) => None,
        (Err(err), Ok(())) | (Ok(()), Err(err)) => Some(err),
        (Err(first), Err(second)) => Some(first.merge(second)),
    };
    if let Some(violations) = violations {
        let transaction_id = transaction_id_of(transaction).filter(|_| transaction_valid);
        return Err(rejected(CapabilityError::invalid_input(
            capability,
            transaction_id,
            Box::new(violations.relabel(format!("{capability} input"))),
        )));
    }

    let mut cx = BuildContext::loaded(refs, policy);
    let transaction = construct::<Transaction>(transaction, &mut cx).map_err(|err| {
        rejected(CapabilityError::invalid_input(
            capability,
            None,
            Box::new(err.at(&FieldPath::root().join("transaction"))),
        ))
    })?;
    let request = construct::<Op::Request>(request, &mut cx).map_err(|err| {
        rejected(CapabilityError::invalid_input(
            capability,
            Some(transaction.id()),
            Box::new(err.at(&FieldPath::root().join("request"))),
        ))
    })?;
    Ok((transaction, request))
}

/// Id of a raw transaction envelope, when it carries a valid one.
pub(crate) fn transaction_id_of(transaction: &Value) -> Option<Uuid> {
    transaction
        .get("id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

fn response_label<Op: Operation>() -> String {
    format!("{} response", Op::KIND)
}

fn rejected(err: CapabilityError) -> CapabilityError {
    warn!(
        "event=capability_invoke module=capability status=error capability={} stage={} kind=invalid_input",
        err.capability, err.stage
    );
    err
}

fn log_failure(err: &CapabilityError, started: Instant) {
    warn!(
        "event=capability_invoke module=capability status=error capability={} stage={} kind=app_error transaction_id={} duration_ms={}",
        err.capability,
        err.stage,
        err.transaction_id.map(|id| id.to_string()).unwrap_or_default(),
        started.elapsed().as_millis()
    );
}
