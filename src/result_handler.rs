//! Result handlers: turning an outcome into an HTTP response.
//!
//! The endpoint calls its result handler exactly once per request that was
//! not a preflight and was not finalized by a middleware. It receives either
//! the handler's output or the first error the pipeline captured, together
//! with the raw input as it was extracted from the request.
//!
//! A result handler may fail. The endpoint logs the failure and returns
//! normally; whatever was written to the response before the failure is all
//! the client gets.

use std::future::Future;
use std::sync::Arc;

use http::StatusCode;
use serde_json::{Value, json};

use crate::error::{BoxError, Error};
use crate::handler::BoxFuture;
use crate::request::Request;
use crate::response::Response;
use crate::schema::Input;

/// The outcome of one request, as handed to a result handler.
#[derive(Debug)]
pub struct ResultParams {
    /// First failure among input validation, middlewares and the handler.
    pub error: Option<Error>,
    /// Raw input extracted from the request, before any schema ran.
    pub input: Input,
    /// Handler output; `None` whenever `error` is set.
    pub output: Option<Value>,
    pub request: Arc<Request>,
    pub response: Response,
}

#[doc(hidden)]
pub trait ErasedResultHandler {
    fn call(&self, params: ResultParams) -> BoxFuture<Result<(), BoxError>>;
}

#[doc(hidden)]
pub type BoxedResultHandler = Arc<dyn ErasedResultHandler + Send + Sync + 'static>;

/// Implemented for every valid result handler:
///
/// ```text
/// Fn(ResultParams) -> impl Future<Output = Result<(), E>>
/// ```
///
/// where `E` converts into [`BoxError`]. The trait is sealed.
pub trait ResultHandler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_result_handler(self) -> BoxedResultHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, E> private::Sealed for F
where
    F: Fn(ResultParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
}

impl<F, Fut, E> ResultHandler for F
where
    F: Fn(ResultParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn into_boxed_result_handler(self) -> BoxedResultHandler {
        Arc::new(FnResultHandler(self))
    }
}

struct FnResultHandler<F>(F);

impl<F, Fut, E> ErasedResultHandler for FnResultHandler<F>
where
    F: Fn(ResultParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError>,
{
    fn call(&self, params: ResultParams) -> BoxFuture<Result<(), BoxError>> {
        let fut = (self.0)(params);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

// ── Default ───────────────────────────────────────────────────────────────────

/// The result handler endpoints use unless told otherwise.
///
/// | Outcome | Status | Body |
/// |---|---|---|
/// | output | `200` | `{"status":"success","data":<output>}` |
/// | validation error | `400` | `{"status":"error","error":{"message":<error>}}` |
/// | any other error | `500` | `{"status":"error","error":{"message":<error>}}` |
///
/// Fails with [`Error::ResponseEnded`] if the response was already sent.
pub async fn default_result_handler(params: ResultParams) -> Result<(), Error> {
    let ResultParams { error, output, response, .. } = params;
    match error {
        Some(error) => {
            let status = if error.is_validation() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            response.status(status).json(&json!({
                "status": "error",
                "error": { "message": error.to_string() },
            }))
        }
        None => response.status(StatusCode::OK).json(&json!({
            "status": "success",
            "data": output.unwrap_or(Value::Null),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn params(error: Option<Error>, output: Option<Value>) -> (ResultParams, Response) {
        let response = Response::new();
        let params = ResultParams {
            error,
            input: Input::new(),
            output,
            request: Arc::new(Request::new(http::Method::POST)),
            response: response.clone(),
        };
        (params, response)
    }

    fn body(response: &Response) -> Value {
        serde_json::from_slice(&response.body()).unwrap()
    }

    #[tokio::test]
    async fn success_envelope() {
        let (params, response) = params(None, Some(json!({"greeting": "Hello, Ada"})));
        default_result_handler(params).await.unwrap();

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(
            body(&response),
            json!({"status": "success", "data": {"greeting": "Hello, Ada"}}),
        );
    }

    #[tokio::test]
    async fn validation_error_is_bad_request() {
        let error = Error::from(ValidationError::single("name", "required"));
        let (params, response) = params(Some(error), None);
        default_result_handler(params).await.unwrap();

        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body(&response),
            json!({"status": "error", "error": {"message": "Validation error: name: required"}}),
        );
    }

    #[tokio::test]
    async fn other_errors_are_internal() {
        let (params, response) = params(Some(Error::Handler("db down".into())), None);
        default_result_handler(params).await.unwrap();

        assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&response)["error"]["message"], json!("db down"));
    }

    #[tokio::test]
    async fn fails_on_finalized_response() {
        let (params, response) = params(None, Some(json!(1)));
        response.end();
        let err = default_result_handler(params).await.unwrap_err();
        assert!(matches!(err, Error::ResponseEnded));
    }
}
