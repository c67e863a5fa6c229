//! Incoming HTTP request type.
//!
//! By the time a [`Request`] reaches an endpoint its query string is decoded
//! into a map and its body parsed as JSON. The transport decides how that
//! happens; [`Request::from_http`] and [`Request::from_hyper`] cover the
//! common cases.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::BodyExt;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::method::InputSource;
use crate::schema::{merge, Input};

/// An incoming HTTP request with its query and body already decoded.
#[derive(Clone, Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) query: Map<String, Value>,
    pub(crate) body: Value,
}

impl Request {
    /// A bare request for `method` on `/`, with no query and no body.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            uri: Uri::from_static("/"),
            headers: HeaderMap::new(),
            query: Map::new(),
            body: Value::Null,
        }
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Builds a request from a buffered `http` request.
    ///
    /// The query string is decoded from the URI; an empty body becomes
    /// `null`, anything else must be JSON.
    pub fn from_http(req: http::Request<Bytes>) -> Result<Self, Error> {
        let (parts, body) = req.into_parts();
        let query = parse_query(parts.uri.query().unwrap_or(""))?;
        let body = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body)?
        };
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            query,
            body,
        })
    }

    /// Collects the body of a hyper request and builds a [`Request`] from it.
    pub async fn from_hyper(req: hyper::Request<hyper::body::Incoming>) -> Result<Self, Error> {
        let (parts, body) = req.into_parts();
        let bytes = body.collect().await?.to_bytes();
        Self::from_http(http::Request::from_parts(parts, bytes))
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn query(&self) -> &Map<String, Value> { &self.query }
    pub fn body(&self) -> &Value { &self.body }

    /// Header lookup; `None` if absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Raw input for this request's verb, before any schema runs.
    ///
    /// GET reads the query, POST/PUT/PATCH the body, DELETE the query with
    /// body keys on top. `None` for OPTIONS and for verbs endpoints do not
    /// serve.
    pub fn raw_input(&self) -> Option<Input> {
        match InputSource::for_method(&self.method)? {
            InputSource::Query => Some(self.query.clone()),
            InputSource::Body => Some(body_map(&self.body)),
            InputSource::QueryAndBody => {
                let mut input = self.query.clone();
                merge(&mut input, body_map(&self.body));
                Some(input)
            }
            InputSource::Preflight => None,
        }
    }
}

/// Only object bodies carry keys; any other JSON shape contributes none.
fn body_map(body: &Value) -> Input {
    match body {
        Value::Object(map) => map.clone(),
        _ => Input::new(),
    }
}

/// Decodes a query string; repeated keys collect into an array in order.
fn parse_query(query: &str) -> Result<Map<String, Value>, Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    let mut map = Map::new();
    for (key, value) in pairs {
        match map.get_mut(&key) {
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                map.insert(key, Value::String(value));
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn http_request(method: Method, uri: &str, body: &'static str) -> http::Request<Bytes> {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
    }

    #[test]
    fn decodes_query_and_json_body() {
        let req = Request::from_http(http_request(
            Method::POST,
            "/users?page=2&q=rust+lang",
            r#"{"name":"Ada"}"#,
        ))
        .unwrap();

        assert_eq!(Value::Object(req.query().clone()), json!({"page": "2", "q": "rust lang"}));
        assert_eq!(req.body(), &json!({"name": "Ada"}));
        assert_eq!(req.uri().path(), "/users");
    }

    #[test]
    fn repeated_query_keys_become_arrays() {
        let req = Request::from_http(http_request(Method::GET, "/?tag=a&tag=b&tag=c", "")).unwrap();
        assert_eq!(req.query().get("tag"), Some(&json!(["a", "b", "c"])));
        assert_eq!(req.body(), &Value::Null);
    }

    #[test]
    fn rejects_malformed_body() {
        let err = Request::from_http(http_request(Method::POST, "/", "{nope")).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn raw_input_by_verb() {
        let query = json!({"id": "1", "force": "no"}).as_object().cloned().unwrap();
        let body = json!({"force": "yes", "reason": "dup"});

        let get = Request::new(Method::GET).with_query(query.clone()).with_body(body.clone());
        assert_eq!(get.raw_input(), Some(query.clone()));

        let post = Request::new(Method::POST).with_query(query.clone()).with_body(body.clone());
        assert_eq!(post.raw_input().map(Value::Object), Some(body.clone()));

        let delete = Request::new(Method::DELETE).with_query(query.clone()).with_body(body.clone());
        assert_eq!(
            delete.raw_input().map(Value::Object),
            Some(json!({"id": "1", "force": "yes", "reason": "dup"})),
        );

        assert_eq!(Request::new(Method::OPTIONS).raw_input(), None);
        assert_eq!(Request::new(Method::HEAD).raw_input(), None);
    }

    #[test]
    fn non_object_body_contributes_nothing() {
        let req = Request::new(Method::PUT).with_body(json!([1, 2, 3]));
        assert_eq!(req.raw_input(), Some(Input::new()));
    }

    #[test]
    fn header_lookup() {
        let req = Request::new(Method::GET)
            .with_header(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        assert_eq!(req.header("authorization"), Some("Bearer t"));
        assert_eq!(req.header("x-missing"), None);
    }
}
