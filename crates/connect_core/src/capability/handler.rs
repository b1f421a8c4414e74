//! Plugin-supplied capability callbacks.

use crate::capability::transaction::Transaction;
use futures_util::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

/// Error returned by plugin code.
pub type HandlerError = Box<dyn Error + Send + Sync + 'static>;

type HandlerFn<Req> =
    dyn Fn(Transaction, Arc<Req>) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync;

/// Type-erased plugin callback for requests of type `Req`.
///
/// The callback's output is rendered to JSON so the pipeline can backfill and
/// validate it like any other untrusted payload.
pub struct Handler<Req> {
    inner: Arc<HandlerFn<Req>>,
}

impl<Req> Clone for Handler<Req> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Req> Debug for Handler<Req> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl<Req> Handler<Req>
where
    Req: Send + Sync + 'static,
{
    /// Wraps an async callback.
    ///
    /// The callback runs only when the returned future is first polled, so a
    /// panic anywhere in plugin code surfaces while polling.
    pub fn new<F, Fut, Out, E>(callback: F) -> Self
    where
        F: Fn(Transaction, Arc<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Out, E>> + Send + 'static,
        Out: Serialize,
        E: Into<HandlerError>,
    {
        let callback = Arc::new(callback);
        Self {
            inner: Arc::new(move |transaction, request| {
                let callback = Arc::clone(&callback);
                async move {
                    let output = callback(transaction, request).await.map_err(Into::into)?;
                    serde_json::to_value(output).map_err(|err| Box::new(err) as HandlerError)
                }
                .boxed()
            }),
        }
    }

    /// Wraps a synchronous callback.
    pub fn sync<F, Out, E>(callback: F) -> Self
    where
        F: Fn(Transaction, Arc<Req>) -> Result<Out, E> + Send + Sync + 'static,
        Out: Serialize + Send + 'static,
        E: Into<HandlerError> + Send + 'static,
    {
        Self::new(move |transaction, request| future::ready(callback(transaction, request)))
    }

    pub(crate) fn call(
        &self,
        transaction: Transaction,
        request: Arc<Req>,
    ) -> BoxFuture<'static, Result<Value, HandlerError>> {
        (self.inner)(transaction, request)
    }
}
