//! Minimal tollgate example: two endpoints behind a hand-rolled hyper server.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl -X POST http://localhost:3000/greet \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"Ada"}'
//!   curl -X POST http://localhost:3000/greet -d '{}'
//!   curl 'http://localhost:3000/users?id=42' -H 'authorization: Bearer demo'
//!   curl http://localhost:3000/users?id=42
//!   curl -X OPTIONS -i http://localhost:3000/greet

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tollgate::{
    BoxError, Endpoint, JsonSchema, Method, MiddlewareDefinition, MiddlewareParams, Options,
    Request, Response, Typed, handler, schema,
};

#[derive(Deserialize, Serialize)]
struct Greet {
    name: String,
}

#[derive(Serialize)]
struct Greeting {
    greeting: String,
}

struct Routes {
    greet: Endpoint,
    user: Endpoint,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = std::env::var("TOLLGATE_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_owned())
        .parse()?;

    let routes = Arc::new(Routes { greet: greet()?, user: user()? });
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "tollgate demo listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let routes = Arc::clone(&routes);
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let routes = Arc::clone(&routes);
                async move { dispatch(routes, req).await }
            });
            if let Err(e) = ConnBuilder::new(TokioExecutor::new()).serve_connection(io, svc).await {
                error!(%peer, "connection error: {e}");
            }
        });
    }
}

// POST /greet
fn greet() -> Result<Endpoint, BoxError> {
    Ok(Endpoint::builder(Method::Post)
        .input_schema(Typed::<Greet>::new())
        .output_schema(JsonSchema::new(&json!({
            "type": "object",
            "required": ["greeting"],
            "properties": { "greeting": { "type": "string" } }
        }))?)
        .handler(handler::typed(|input: Greet, _: Options| async move {
            Ok::<_, BoxError>(Greeting { greeting: format!("Hello, {}", input.name) })
        })))
}

// GET /users?id=…, bearer token required
fn user() -> Result<Endpoint, BoxError> {
    let auth = MiddlewareDefinition::new(schema::empty(), |params: MiddlewareParams| async move {
        let token = params
            .request
            .header("authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::to_owned);
        let mut options = Options::new();
        match token {
            Some(token) => {
                options.insert("token".into(), Value::String(token));
            }
            None => {
                params.response.status(StatusCode::UNAUTHORIZED);
                params
                    .response
                    .json(&json!({ "status": "error", "error": { "message": "unauthorized" } }))?;
            }
        }
        Ok::<_, BoxError>(options)
    });

    Ok(Endpoint::builder(Method::Get)
        .middleware(auth)
        .input_schema(JsonSchema::new(&json!({
            "type": "object",
            "required": ["id"],
            "properties": { "id": { "type": "string", "pattern": "^[0-9]+$" } }
        }))?)
        .handler(|params: tollgate::HandlerParams| async move {
            Ok::<_, BoxError>(json!({ "id": params.input["id"], "name": "alice" }))
        }))
}

async fn dispatch(
    routes: Arc<Routes>,
    req: hyper::Request<hyper::body::Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let endpoint = match req.uri().path() {
        "/greet" => &routes.greet,
        "/users" => &routes.user,
        _ => return Ok(not_found()),
    };

    let response = Response::new();
    match Request::from_hyper(req).await {
        Ok(request) => endpoint.execute(request, &response).await,
        Err(e) => {
            response.status(StatusCode::BAD_REQUEST);
            let body = json!({ "status": "error", "error": { "message": e.to_string() } });
            if let Err(e) = response.json(&body) {
                error!("failed to write error response: {e}");
            }
        }
    }
    Ok(response.to_http())
}

fn not_found() -> http::Response<Full<Bytes>> {
    let response = Response::new();
    response.status(StatusCode::NOT_FOUND);
    response.end();
    response.to_http()
}
