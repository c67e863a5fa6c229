//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! An [`Endpoint`](crate::Endpoint) owns exactly one business handler, but
//! every handler is a different closure type. We hide the concrete type
//! behind a trait object so endpoints with different handlers share one type:
//!
//! ```text
//! |params: HandlerParams| async move { … }      ← user writes this
//!        ↓ Endpoint::builder(..).handler(f)
//! f.into_boxed_handler()                         ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(f))                         ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(params)  at request time          ← one vtable dispatch
//! ```
//!
//! [`typed`] lifts a handler over concrete serde types into the same shape.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BoxError;
use crate::schema::{Input, Options};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future, `Send + 'static` so the runtime can
/// move it across threads.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// What a handler receives: the endpoint-validated input and the options
/// accumulated by the middleware chain.
#[derive(Clone, Debug, Default)]
pub struct HandlerParams {
    pub input: Input,
    pub options: Options,
}

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, params: HandlerParams) -> BoxFuture<Result<Value, BoxError>>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid business handler.
///
/// You never implement this yourself. It is satisfied by any function or
/// closure with the shape:
///
/// ```text
/// Fn(HandlerParams) -> impl Future<Output = Result<serde_json::Value, E>>
/// ```
///
/// where `E` converts into [`BoxError`]. The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, E> private::Sealed for F
where
    F: Fn(HandlerParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError>,
{
}

impl<F, Fut, E> Handler for F
where
    F: Fn(HandlerParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

struct FnHandler<F>(F);

impl<F, Fut, E> ErasedHandler for FnHandler<F>
where
    F: Fn(HandlerParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn call(&self, params: HandlerParams) -> BoxFuture<Result<Value, BoxError>> {
        let fut = (self.0)(params);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

// ── Typed adapter ─────────────────────────────────────────────────────────────

/// Adapts a handler over concrete types.
///
/// The validated input is deserialized into `In` and the returned `Out` is
/// serialized back into a JSON value. A deserialization failure means the
/// endpoint's input schema does not describe `In`, and surfaces as a handler
/// error.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use tollgate::{BoxError, Endpoint, Method, Options, handler};
///
/// #[derive(Deserialize)]
/// struct Greet { name: String }
///
/// #[derive(Serialize)]
/// struct Greeting { greeting: String }
///
/// let endpoint = Endpoint::builder(Method::Post).handler(handler::typed(
///     |input: Greet, _options: Options| async move {
///         Ok::<_, BoxError>(Greeting { greeting: format!("Hello, {}", input.name) })
///     },
/// ));
/// # let _ = endpoint;
/// ```
pub fn typed<F, In, Out, Fut, E>(
    f: F,
) -> impl Fn(HandlerParams) -> BoxFuture<Result<Value, BoxError>> + Send + Sync + 'static
where
    F: Fn(In, Options) -> Fut + Send + Sync + 'static,
    In: DeserializeOwned + Send + 'static,
    Out: Serialize + Send + 'static,
    Fut: Future<Output = Result<Out, E>> + Send + 'static,
    E: Into<BoxError>,
{
    move |params: HandlerParams| {
        let input = serde_json::from_value::<In>(Value::Object(params.input));
        let fut = input.map(|input| f(input, params.options));
        let boxed: BoxFuture<Result<Value, BoxError>> = Box::pin(async move {
            let output = fut?.await.map_err(Into::<BoxError>::into)?;
            Ok::<_, BoxError>(serde_json::to_value(output)?)
        });
        boxed
    }
}
