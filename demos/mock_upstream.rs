//! Local stand-in for the `/external` upstream.
//!
//! Run with `cargo run --example mock_upstream` and point `upstream.url`
//! at `http://127.0.0.1:8081/get`.

use axum::{http::header, routing::get, Router};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let app = Router::new().route(
        "/get",
        get(|| async {
            (
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"origin":"127.0.0.1","url":"http://127.0.0.1:8081/get"}"#,
            )
        }),
    );

    let addr = SocketAddr::from(([127, 0, 0, 1], 8081));
    println!("Mock upstream listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
