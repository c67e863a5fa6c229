//! Endpoint verbs and where each one reads its input from.
//!
//! An endpoint is declared for exactly one of the five verbs below. The verb
//! of an incoming request decides the input source independently of that
//! declaration, because preflight `OPTIONS` requests and `DELETE` requests
//! with a body both reach the same endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The verb an endpoint is registered under.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Delete,
    Get,
    Patch,
    Post,
    Put,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Get    => "GET",
            Self::Patch  => "PATCH",
            Self::Post   => "POST",
            Self::Put    => "PUT",
        }
    }

    /// The equivalent [`http::Method`].
    pub fn to_http(self) -> http::Method {
        match self {
            Self::Delete => http::Method::DELETE,
            Self::Get    => http::Method::GET,
            Self::Patch  => http::Method::PATCH,
            Self::Post   => http::Method::POST,
            Self::Put    => http::Method::PUT,
        }
    }
}

/// Parses a method name in either case (`"get"` or `"GET"`).
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DELETE" => Ok(Self::Delete),
            "GET"    => Ok(Self::Get),
            "PATCH"  => Ok(Self::Patch),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            _        => Err(()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        method.to_http()
    }
}

// ── Input sources ─────────────────────────────────────────────────────────────

/// Where the raw input of a request comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputSource {
    /// GET
    Query,
    /// POST, PUT, PATCH
    Body,
    /// DELETE: query first, body keys override.
    QueryAndBody,
    /// OPTIONS: answered before any input is read.
    Preflight,
}

impl InputSource {
    /// Maps a request verb to its input source. `None` for verbs an endpoint
    /// does not serve (HEAD, TRACE, CONNECT, extensions).
    pub fn for_method(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET     => Some(Self::Query),
            http::Method::POST
            | http::Method::PUT
            | http::Method::PATCH => Some(Self::Body),
            http::Method::DELETE  => Some(Self::QueryAndBody),
            http::Method::OPTIONS => Some(Self::Preflight),
            _                     => None,
        }
    }
}
