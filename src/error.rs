//! Unified error type.
//!
//! Every failure inside an endpoint pipeline converges on [`Error`]: schema
//! rejections, middleware and handler failures, and misuse of the response
//! sink. The first one captured is what the result handler sees.

use std::fmt;

use thiserror::Error;

/// Boxed error returned by middlewares, handlers and result handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type of tollgate's fallible operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A schema rejected the accumulated input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A middleware transform failed.
    #[error("{0}")]
    Middleware(BoxError),

    /// The business handler failed.
    #[error("{0}")]
    Handler(BoxError),

    /// The request verb has no input source (HEAD, TRACE, CONNECT, ...).
    #[error("method {0} is not supported")]
    UnsupportedMethod(http::Method),

    /// A body write was attempted after the response was finalized.
    #[error("response has already been sent")]
    ResponseEnded,

    /// A schema definition could not be compiled.
    #[error("invalid schema: {0}")]
    Schema(String),

    /// A request body could not be parsed, or a response body serialized.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The query string could not be decoded.
    #[error("invalid query string: {0}")]
    InvalidQuery(#[from] serde_urlencoded::de::Error),

    /// Reading the request body from the connection failed.
    #[error("body: {0}")]
    Body(#[from] hyper::Error),
}

impl Error {
    /// Returns the validation error if this is a schema rejection.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// One reason a value failed a schema.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Issue {
    /// Location of the offending value; empty for the root.
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Raised by [`Schema::parse`](crate::Schema::parse) on non-conforming input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    issues: Vec<Issue>,
}

impl ValidationError {
    pub fn new(issues: Vec<Issue>) -> Self {
        Self { issues }
    }

    /// Shorthand for a single issue.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(vec![Issue::new(path, message)])
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validation error")?;
        for (i, issue) in self.issues.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { "; " })?;
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_lists_issues() {
        let err = ValidationError::new(vec![
            Issue::new("name", "is required"),
            Issue::new("", "unexpected shape"),
        ]);
        assert_eq!(err.to_string(), "Validation error: name: is required; unexpected shape");
    }

    #[test]
    fn validation_converts_into_error() {
        let err: Error = ValidationError::single("age", "must be a number").into();
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Validation error: age: must be a number");
        assert_eq!(err.as_validation().map(|v| v.issues().len()), Some(1));
    }

    #[test]
    fn middleware_error_displays_source_message() {
        let err = Error::Middleware("token expired".into());
        assert_eq!(err.to_string(), "token expired");
        assert!(!err.is_validation());
    }

    #[test]
    fn unsupported_method_names_the_verb() {
        let err = Error::UnsupportedMethod(http::Method::HEAD);
        assert_eq!(err.to_string(), "method HEAD is not supported");
    }
}
