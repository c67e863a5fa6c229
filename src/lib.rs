//! # tollgate
//!
//! Schema-validated HTTP endpoints. One verb, one input/output schema pair,
//! a chain of reusable middlewares, one business handler, and a result
//! handler that owns the response.
//!
//! ## The contract
//!
//! Every request that reaches [`Endpoint::execute`] goes through the same
//! steps, in the same order:
//!
//! 1. CORS headers are set. Always, before anything else.
//! 2. `OPTIONS` ends the response right there.
//! 3. Raw input is read: query for GET, body for POST/PUT/PATCH, query plus
//!    body for DELETE (body wins on collisions).
//! 4. Each middleware validates the accumulated input against its own schema,
//!    merges the result in, and contributes options.
//! 5. The endpoint's input schema validates the final input.
//! 6. The handler gets the validated input and the merged options.
//! 7. The result handler gets the output, or the first error, exactly once.
//!
//! A middleware that finalizes the response ends the request early; the
//! result handler does not run. A result handler that fails is logged and
//! ignored.
//!
//! What tollgate leaves to the host: routing, the server loop, TLS. Feed it a
//! [`Request`], hand it a [`Response`], and send [`Response::to_http`] back
//! over whatever transport you run.
//!
//! ## Quick start
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use tollgate::{BoxError, Endpoint, Method, Options, Typed, handler};
//!
//! #[derive(Deserialize, Serialize)]
//! struct Greet { name: String }
//!
//! #[derive(Serialize)]
//! struct Greeting { greeting: String }
//!
//! let greet = Endpoint::builder(Method::Post)
//!     .input_schema(Typed::<Greet>::new())
//!     .handler(handler::typed(|input: Greet, _: Options| async move {
//!         Ok::<_, BoxError>(Greeting { greeting: format!("Hello, {}", input.name) })
//!     }));
//!
//! assert_eq!(greet.method(), Method::Post);
//! ```

mod endpoint;
mod error;
mod method;
mod request;
mod response;

pub mod handler;
pub mod middleware;
pub mod result_handler;
pub mod schema;

pub use endpoint::{Endpoint, EndpointBuilder};
pub use error::{BoxError, Error, Issue, ValidationError};
pub use handler::{Handler, HandlerParams};
pub use method::{InputSource, Method};
pub use middleware::{Middleware, MiddlewareDefinition, MiddlewareParams};
pub use request::Request;
pub use response::{ContentType, Response};
pub use result_handler::{ResultHandler, ResultParams, default_result_handler};
pub use schema::{Input, JsonSchema, Options, Schema, Typed, Validated, merge};
