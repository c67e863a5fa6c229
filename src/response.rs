//! Outgoing HTTP response sink.
//!
//! A [`Response`] is a handle: clones share one underlying response, the way
//! every stage of a request pipeline writes to the same socket. Middlewares
//! may finalize it early, the result handler normally writes it, and the
//! transport turns it into an `http::Response` with [`Response::to_http`]
//! once the endpoint is done.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, IntoHeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::error::Error;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`Response::send`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Csv,          // text/csv
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv         => "text/csv",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct State {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    ended: bool,
}

/// A shared, writable HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use serde_json::json;
/// use tollgate::Response;
///
/// let response = Response::new();
/// let sink = response.clone();
///
/// sink.status(StatusCode::CREATED);
/// sink.json(&json!({ "id": 42 })).unwrap();
///
/// assert!(response.is_ended());
/// assert_eq!(response.status_code(), StatusCode::CREATED);
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    state: Arc<Mutex<State>>,
}

impl Response {
    /// An open `200 OK` response with no headers and no body.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                ended: false,
            })),
        }
    }

    // No lock is held across an await, so a poisoned state is still coherent.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the status code sent with the body.
    pub fn status(&self, code: StatusCode) -> &Self {
        self.lock().status = code;
        self
    }

    /// Sets a header, replacing any previous value under the same name.
    pub fn set_header<K: IntoHeaderName>(&self, name: K, value: HeaderValue) -> &Self {
        self.lock().headers.insert(name, value);
        self
    }

    pub fn header(&self, name: &str) -> Option<HeaderValue> {
        self.lock().headers.get(name).cloned()
    }

    pub fn headers(&self) -> HeaderMap {
        self.lock().headers.clone()
    }

    pub fn status_code(&self) -> StatusCode {
        self.lock().status
    }

    pub fn body(&self) -> Bytes {
        self.lock().body.clone()
    }

    /// Whether the response has been finalized by anyone holding a handle.
    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    /// Finalizes the response with whatever body it has. Idempotent.
    pub fn end(&self) {
        self.lock().ended = true;
    }

    /// Writes `body` with the given content type and finalizes the response.
    ///
    /// Fails with [`Error::ResponseEnded`] if the response was already sent.
    pub fn send(&self, content_type: ContentType, body: impl Into<Bytes>) -> Result<(), Error> {
        let mut state = self.lock();
        if state.ended {
            return Err(Error::ResponseEnded);
        }
        state.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
        state.body = body.into();
        state.ended = true;
        Ok(())
    }

    /// Serializes `value` as the JSON body and finalizes the response.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value)?;
        self.send(ContentType::Json, bytes)
    }

    /// Snapshot of the response for the transport.
    pub fn to_http(&self) -> http::Response<Full<Bytes>> {
        let state = self.lock();
        let mut response = http::Response::new(Full::new(state.body.clone()));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers.clone();
        response
    }
}

impl Default for Response {
    fn default() -> Self { Self::new() }
}
