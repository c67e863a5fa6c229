//! `Request::from_hyper` over a real HTTP/1 connection.

use std::convert::Infallible;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use tollgate::{Error, Request};

/// Writes `raw` to a hyper server connection and returns what `from_hyper`
/// made of the first request it received.
async fn receive(raw: &'static [u8]) -> Result<Request, Error> {
    let (mut client, server) = tokio::io::duplex(4096);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let svc = service_fn(move |req: hyper::Request<Incoming>| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(Request::from_hyper(req).await);
            Ok::<_, Infallible>(http::Response::new(Full::new(Bytes::new())))
        }
    });
    tokio::spawn(
        http1::Builder::new()
            .half_close(true)
            .serve_connection(TokioIo::new(server), svc),
    );

    client.write_all(raw).await.unwrap();
    client.shutdown().await.unwrap();
    rx.recv().await.expect("service was not called")
}

#[tokio::test]
async fn collects_body_and_query_from_a_connection() {
    let request = receive(
        b"POST /greet?lang=en HTTP/1.1\r\n\
          host: localhost\r\n\
          content-type: application/json\r\n\
          content-length: 14\r\n\
          \r\n\
          {\"name\":\"Ada\"}",
    )
    .await
    .unwrap();

    assert_eq!(request.method(), http::Method::POST);
    assert_eq!(request.uri().path(), "/greet");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.query().get("lang"), Some(&json!("en")));
    assert_eq!(request.body(), &json!({"name": "Ada"}));
}

#[tokio::test]
async fn bodiless_get_has_null_body() {
    let request = receive(b"GET /users?id=7 HTTP/1.1\r\nhost: localhost\r\n\r\n")
        .await
        .unwrap();

    assert_eq!(request.body(), &serde_json::Value::Null);
    assert_eq!(request.raw_input().map(serde_json::Value::Object), Some(json!({"id": "7"})));
}

#[tokio::test]
async fn truncated_body_is_a_body_error() {
    let err = receive(
        b"POST / HTTP/1.1\r\n\
          host: localhost\r\n\
          content-length: 40\r\n\
          \r\n\
          {\"name\":",
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Body(_)), "{err:?}");
}
