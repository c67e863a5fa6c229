//! Endpoints: one verb, one schema pair, one middleware chain, one handler.
//!
//! # Pipeline
//!
//! ```text
//! CORS headers ─→ OPTIONS? ──yes──→ end response                (preflight)
//!                    │ no
//!                    ↓
//!              raw input by verb
//!                    ↓
//!   ┌─→ middleware[i]: parse input, merge; run, merge options
//!   │        │ response ended? ──yes──→ return               (bypassed)
//!   └────────┘
//!                    ↓
//!        endpoint input schema
//!                    ↓
//!               handler(input, options)
//!                    ↓
//!   result handler(error | output, raw input)  ← exactly once
//! ```
//!
//! The first failure in the middle section is captured and skips everything
//! up to the result handler.

use std::fmt;
use std::sync::Arc;

use http::HeaderValue;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler, Handler, HandlerParams};
use crate::method::Method;
use crate::middleware::{MiddlewareDefinition, MiddlewareParams};
use crate::request::Request;
use crate::response::Response;
use crate::result_handler::{
    BoxedResultHandler, ErasedResultHandler, ResultHandler, ResultParams, default_result_handler,
};
use crate::schema::{self, BoxedSchema, Input, Options, Schema, merge};

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
const ALLOW_HEADERS: &str = "content-type";

/// A request handler bound to its verb, schemas and middleware chain.
///
/// Built once at startup with [`Endpoint::builder`], then shared (behind an
/// `Arc`) by every request it serves. Nothing in an `Endpoint` changes after
/// construction; all per-request state lives inside [`execute`](Self::execute).
///
/// ```rust
/// use serde_json::json;
/// use tollgate::{BoxError, Endpoint, HandlerParams, Method, Request, Response};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let endpoint = Endpoint::builder(Method::Post).handler(|params: HandlerParams| async move {
///     let name = params.input["name"].as_str().unwrap_or("world").to_owned();
///     Ok::<_, BoxError>(json!({ "greeting": format!("Hello, {name}") }))
/// });
///
/// let request = Request::new(http::Method::POST).with_body(json!({ "name": "Ada" }));
/// let response = Response::new();
/// endpoint.execute(request, &response).await;
///
/// assert!(response.is_ended());
/// # }
/// ```
pub struct Endpoint {
    method: Method,
    middlewares: Vec<MiddlewareDefinition>,
    input_schema: BoxedSchema,
    output_schema: BoxedSchema,
    handler: BoxedHandler,
    result_handler: BoxedResultHandler,
}

impl Endpoint {
    /// Starts an endpoint for `method`.
    pub fn builder(method: Method) -> EndpointBuilder {
        EndpointBuilder {
            method,
            middlewares: Vec::new(),
            input_schema: Arc::new(schema::any()),
            output_schema: Arc::new(schema::any()),
            result_handler: None,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn middlewares(&self) -> &[MiddlewareDefinition] {
        &self.middlewares
    }

    pub fn input_schema(&self) -> &dyn Schema {
        self.input_schema.as_ref()
    }

    /// Describes the handler's output. Not enforced by [`execute`](Self::execute).
    pub fn output_schema(&self) -> &dyn Schema {
        self.output_schema.as_ref()
    }

    /// Runs one request through the endpoint.
    ///
    /// Never fails: every error ends up with the result handler, and a
    /// failing result handler is logged.
    pub async fn execute(&self, request: Request, response: &Response) {
        response
            .set_header(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN))
            .set_header(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS))
            .set_header(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));

        if request.method() == http::Method::OPTIONS {
            debug!(endpoint = %self.method, "preflight answered");
            response.end();
            return;
        }

        let request = Arc::new(request);
        let initial_input = request.raw_input();

        let outcome = match &initial_input {
            Some(input) => self.run(input, &request, response).await,
            None => {
                warn!(method = %request.method(), endpoint = %self.method, "unsupported method");
                Err(Error::UnsupportedMethod(request.method().clone()))
            }
        };

        let (error, output) = match outcome {
            Ok(Stage::Bypassed) => return,
            Ok(Stage::Handled(output)) => (None, Some(output)),
            Err(e) => {
                debug!(endpoint = %self.method, error = %e, "pipeline failed");
                (Some(e), None)
            }
        };

        let params = ResultParams {
            error,
            input: initial_input.unwrap_or_default(),
            output,
            request,
            response: response.clone(),
        };
        if let Err(e) = self.result_handler.call(params).await {
            error!("Result handler failure: {e}.");
        }
    }

    /// Middlewares, final input validation and the handler. Stops at the
    /// first error.
    async fn run(
        &self,
        initial_input: &Input,
        request: &Arc<Request>,
        response: &Response,
    ) -> Result<Stage, Error> {
        let mut input = initial_input.clone();
        let mut options = Options::new();

        for (index, def) in self.middlewares.iter().enumerate() {
            let parsed = def.input().parse(&input)?;
            merge(&mut input, parsed);

            let contributed = def
                .call(MiddlewareParams {
                    input: input.clone(),
                    options: options.clone(),
                    request: Arc::clone(request),
                    response: response.clone(),
                })
                .await
                .map_err(Error::Middleware)?;
            merge(&mut options, contributed);

            if response.is_ended() {
                debug!(
                    endpoint = %self.method,
                    middleware = index,
                    "response finalized by middleware"
                );
                return Ok(Stage::Bypassed);
            }
        }

        let input = self.input_schema.parse(&input)?;
        let output = self
            .handler
            .call(HandlerParams { input, options })
            .await
            .map_err(Error::Handler)?;
        Ok(Stage::Handled(output))
    }
}

/// How a pipeline run ended, short of an error.
enum Stage {
    /// A middleware wrote the response; the result handler must not run.
    Bypassed,
    Handled(Value),
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

// ── EndpointBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Endpoint`].
///
/// Obtain via [`Endpoint::builder()`]. Both schemas default to
/// [`schema::any()`] and the result handler to [`default_result_handler`].
/// Terminated by [`handler`](Self::handler), the one part every endpoint
/// must supply.
pub struct EndpointBuilder {
    method: Method,
    middlewares: Vec<MiddlewareDefinition>,
    input_schema: BoxedSchema,
    output_schema: BoxedSchema,
    result_handler: Option<BoxedResultHandler>,
}

impl EndpointBuilder {
    /// Appends a middleware. Stages run in the order they are added.
    pub fn middleware(mut self, def: MiddlewareDefinition) -> Self {
        self.middlewares.push(def);
        self
    }

    pub fn input_schema(mut self, schema: impl Schema) -> Self {
        self.input_schema = Arc::new(schema);
        self
    }

    pub fn output_schema(mut self, schema: impl Schema) -> Self {
        self.output_schema = Arc::new(schema);
        self
    }

    pub fn result_handler(mut self, handler: impl ResultHandler) -> Self {
        self.result_handler = Some(handler.into_boxed_result_handler());
        self
    }

    /// Terminate with the business handler.
    pub fn handler(self, handler: impl Handler) -> Endpoint {
        Endpoint {
            method: self.method,
            middlewares: self.middlewares,
            input_schema: self.input_schema,
            output_schema: self.output_schema,
            handler: handler.into_boxed_handler(),
            result_handler: self
                .result_handler
                .unwrap_or_else(|| default_result_handler.into_boxed_result_handler()),
        }
    }
}
