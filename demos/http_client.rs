//! Runs a few calls through the logging layer against an in-process API.
//!
//! Try it with different verbosity:
//!
//! ```text
//! RUST_LOG=info  cargo run --example http_client
//! RUST_LOG=debug cargo run --example http_client
//! RUST_LOG=trace cargo run --example http_client
//! RUST_LOG='info,[http_client{logger=user-api}]=trace' cargo run --example http_client
//! ```

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use http_level_logger::{CallContext, HttpLoggerLayer, RequestResponseLogger};
use tower::{BoxError, ServiceBuilder, ServiceExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

async fn list_users() -> impl IntoResponse {
    Json(vec!["ada", "grace"])
}

async fn create_user(body: Bytes) -> impl IntoResponse {
    (StatusCode::CREATED, body)
}

async fn delete_user() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let api = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/1", delete(delete_user));

    let client = ServiceBuilder::new()
        .layer(HttpLoggerLayer::new(RequestResponseLogger::new("user-api")))
        .service(api);

    let calls = [
        ("UserApi#list()", http::Method::GET, "/users", ""),
        ("UserApi#create(User)", http::Method::POST, "/users", r#"{"name":"linus"}"#),
        ("UserApi#delete(long)", http::Method::DELETE, "/users/1", ""),
    ];

    for (context, method, path, body) in calls {
        let request = http::Request::builder()
            .method(method)
            .uri(format!("http://api.example.com{path}"))
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .extension(CallContext::new(context))
            .body(Full::new(Bytes::from_static(body.as_bytes())))?;

        let response = client.clone().oneshot(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        info!(%status, bytes = body.len(), "caller received response");
    }

    Ok(())
}
