//! Middleware definitions.
//!
//! A middleware is one stage of an endpoint's input pipeline. It declares an
//! input [`Schema`] that the accumulated input must satisfy, and an async
//! transform that turns the (now validated) input into options for the
//! handler.
//!
//! Stages run once each, in declared order. A transform can:
//!
//! - return options, merged over the ones earlier stages returned;
//! - fail, which aborts the pipeline and hands the error to the result handler;
//! - finalize the response itself, which stops the pipeline without calling
//!   the result handler at all.
//!
//! ```rust
//! use serde_json::Value;
//! use tollgate::{BoxError, MiddlewareDefinition, MiddlewareParams, Options, schema};
//!
//! let auth = MiddlewareDefinition::new(schema::any(), |params: MiddlewareParams| async move {
//!     let token = params.request.header("authorization").unwrap_or_default().to_owned();
//!     if token.is_empty() {
//!         return Err::<Options, BoxError>("missing token".into());
//!     }
//!     let mut options = Options::new();
//!     options.insert("token".into(), Value::String(token));
//!     Ok(options)
//! });
//! # let _ = auth;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::BoxError;
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::schema::{BoxedSchema, Input, Options, Schema};

/// What a middleware transform receives.
///
/// `input` and `options` are copies of the request-local state at the time
/// the stage runs; the transform communicates back only through the options
/// it returns and through `response`.
#[derive(Clone, Debug)]
pub struct MiddlewareParams {
    pub input: Input,
    pub options: Options,
    pub request: Arc<Request>,
    pub response: Response,
}

#[doc(hidden)]
pub trait ErasedMiddleware {
    fn call(&self, params: MiddlewareParams) -> BoxFuture<Result<Options, BoxError>>;
}

#[doc(hidden)]
pub type BoxedMiddleware = Arc<dyn ErasedMiddleware + Send + Sync + 'static>;

/// Implemented for every valid middleware transform:
///
/// ```text
/// Fn(MiddlewareParams) -> impl Future<Output = Result<Options, E>>
/// ```
///
/// where `E` converts into [`BoxError`]. The trait is sealed.
pub trait Middleware: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_middleware(self) -> BoxedMiddleware;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, E> private::Sealed for F
where
    F: Fn(MiddlewareParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Options, E>> + Send + 'static,
    E: Into<BoxError>,
{
}

impl<F, Fut, E> Middleware for F
where
    F: Fn(MiddlewareParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Options, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn into_boxed_middleware(self) -> BoxedMiddleware {
        Arc::new(FnMiddleware(self))
    }
}

struct FnMiddleware<F>(F);

impl<F, Fut, E> ErasedMiddleware for FnMiddleware<F>
where
    F: Fn(MiddlewareParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Options, E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn call(&self, params: MiddlewareParams) -> BoxFuture<Result<Options, BoxError>> {
        let fut = (self.0)(params);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

// ── Definition ────────────────────────────────────────────────────────────────

/// One stage of an endpoint's middleware chain: an input schema plus the
/// transform that runs once the accumulated input satisfies it.
#[derive(Clone)]
pub struct MiddlewareDefinition {
    input: BoxedSchema,
    middleware: BoxedMiddleware,
}

impl MiddlewareDefinition {
    pub fn new(input: impl Schema, middleware: impl Middleware) -> Self {
        Self {
            input: Arc::new(input),
            middleware: middleware.into_boxed_middleware(),
        }
    }

    /// The schema the accumulated input must satisfy before this stage runs.
    pub fn input(&self) -> &dyn Schema {
        self.input.as_ref()
    }

    pub(crate) fn call(&self, params: MiddlewareParams) -> BoxFuture<Result<Options, BoxError>> {
        self.middleware.call(params)
    }
}

impl fmt::Debug for MiddlewareDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareDefinition").finish_non_exhaustive()
    }
}
