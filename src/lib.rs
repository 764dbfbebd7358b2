//! # http-level-logger
//!
//! Logging for HTTP client calls where the amount of detail follows the log
//! level that is active for the logger, rather than a separate setting:
//!
//! - **INFO**: request line, response status line with elapsed time, body sizes
//! - **DEBUG**: additionally request and response bodies
//! - **TRACE**: additionally every request and response header
//!
//! The core is [`RequestResponseLogger`], which exposes four hooks (request,
//! retry, response, I/O error) and writes lines to a [`LogSink`]. The
//! [`HttpLoggerLayer`] tower middleware drives those hooks around any
//! `http`-based client service, and [`LoggingRetryPolicy`] adds the retry
//! line to a tower retry policy.
//!
//! ## Quick Start
//!
//! ```rust
//! use axum::{routing::get, Router};
//! use bytes::Bytes;
//! use http_body_util::{BodyExt, Full};
//! use http_level_logger::{CallContext, HttpLoggerLayer, RequestResponseLogger};
//! use tower::{ServiceBuilder, ServiceExt};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tower::BoxError> {
//! // Any tower service speaking `http` works; here an in-process axum app
//! // stands in for the remote API.
//! let api = Router::new().route("/users", get(|| async { "[]" }));
//!
//! let client = ServiceBuilder::new()
//!     .layer(HttpLoggerLayer::new(RequestResponseLogger::new("user-api")))
//!     .service(api);
//!
//! let request = http::Request::builder()
//!     .uri("http://api.example.com/users")
//!     .extension(CallContext::new("UserApi#list()"))
//!     .body(Full::new(Bytes::new()))?;
//!
//! // With RUST_LOG=info this writes:
//! //   [UserApi#list] ---> GET http://api.example.com/users HTTP/1.1
//! //   [UserApi#list] ---> END HTTP (0-byte body)
//! //   [UserApi#list] <--- HTTP/1.1 200 OK (0ms)
//! //   [UserApi#list] <--- END HTTP (2-byte body)
//! let response = client.oneshot(request).await?;
//! assert_eq!(response.into_body().collect().await?.to_bytes(), "[]");
//! # Ok(())
//! # }
//! ```
//!
//! ## Sinks
//!
//! [`TracingSink`] (the default) emits `tracing` events, [`LogFacadeSink`]
//! writes through the `log` facade, [`CapturingSink`] records lines in memory
//! for tests, and [`MultiSink`] fans out to several of them. Implement
//! [`LogSink`] to plug in anything else.

use bytes::Bytes;
use futures::future::BoxFuture;
use http_body::Body;
use http_body_util::Full;
use std::{
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tower::{BoxError, Layer, Service};
use tracing::{debug, instrument, Instrument, Span};

pub mod body;
use body::{collect_body, rebuffer};

pub mod error;
pub use error::Error;

pub mod logger;
pub use logger::RequestResponseLogger;

pub mod multi_sink;
pub use multi_sink::MultiSink;

pub mod retry;
pub use retry::LoggingRetryPolicy;

pub mod sink;
pub use sink::{CapturingSink, LogFacadeSink, LogSink, Severity, TracingSink};

pub mod types;
pub use types::{CallContext, Charset, Headers, Request, Response, ResponseBody};

/// Tower layer that logs every call passing through it.
///
/// The logger is shared by all services the layer produces, and may also be
/// shared with a [`LoggingRetryPolicy`] through [`HttpLoggerLayer::from_shared`].
///
/// # Examples
///
/// ```rust
/// use http_level_logger::{HttpLoggerLayer, RequestResponseLogger};
/// use tower::ServiceBuilder;
///
/// let layer = HttpLoggerLayer::new(RequestResponseLogger::new("billing-client"));
/// let client = ServiceBuilder::new()
///     .layer(layer)
///     .service(tower::service_fn(|_req: http::Request<http_body_util::Full<bytes::Bytes>>| async {
///         Ok::<_, std::io::Error>(http::Response::new(http_body_util::Full::new(bytes::Bytes::new())))
///     }));
/// # let _ = client;
/// ```
pub struct HttpLoggerLayer<S = TracingSink> {
    logger: Arc<RequestResponseLogger<S>>,
}

impl<S> HttpLoggerLayer<S> {
    pub fn new(logger: RequestResponseLogger<S>) -> Self {
        Self::from_shared(Arc::new(logger))
    }

    pub fn from_shared(logger: Arc<RequestResponseLogger<S>>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<RequestResponseLogger<S>> {
        &self.logger
    }
}

impl<S> Clone for HttpLoggerLayer<S> {
    fn clone(&self) -> Self {
        Self {
            logger: Arc::clone(&self.logger),
        }
    }
}

impl<T, S> Layer<T> for HttpLoggerLayer<S> {
    type Service = HttpLoggerService<T, S>;

    fn layer(&self, inner: T) -> Self::Service {
        HttpLoggerService {
            inner,
            logger: Arc::clone(&self.logger),
        }
    }
}

/// Tower service produced by [`HttpLoggerLayer`].
///
/// Request and response bodies are buffered in full so they can be logged;
/// the inner service receives the request with a [`Full`] body and the
/// caller gets the response back with its body re-attached as a [`Full`].
pub struct HttpLoggerService<T, S = TracingSink> {
    inner: T,
    logger: Arc<RequestResponseLogger<S>>,
}

impl<T: Clone, S> Clone for HttpLoggerService<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            logger: Arc::clone(&self.logger),
        }
    }
}

impl<T, S, ReqBody, ResBody> Service<http::Request<ReqBody>> for HttpLoggerService<T, S>
where
    T: Service<http::Request<Full<Bytes>>, Response = http::Response<ResBody>>
        + Clone
        + Send
        + 'static,
    T::Future: Send + 'static,
    T::Error: Into<BoxError>,
    S: LogSink + 'static,
    ReqBody: Body + Send + 'static,
    ReqBody::Data: Send,
    ReqBody::Error: Into<BoxError>,
    ResBody: Body + Send + 'static,
    ResBody::Data: Send,
    ResBody::Error: Into<BoxError>,
{
    type Response = http::Response<Full<Bytes>>;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    #[instrument(skip_all)]
    fn call(&mut self, request: http::Request<ReqBody>) -> Self::Future {
        // The ready service goes into the future; a fresh clone stays behind.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let logger = Arc::clone(&self.logger);
        let context = CallContext::of(&request).into_owned();

        Box::pin(log_call(inner, logger, context, request).instrument(Span::current()))
    }
}

async fn log_call<T, S, ReqBody, ResBody>(
    mut inner: T,
    logger: Arc<RequestResponseLogger<S>>,
    context: String,
    request: http::Request<ReqBody>,
) -> Result<http::Response<Full<Bytes>>, BoxError>
where
    T: Service<http::Request<Full<Bytes>>, Response = http::Response<ResBody>>,
    T::Error: Into<BoxError>,
    S: LogSink,
    ReqBody: Body,
    ReqBody::Error: Into<BoxError>,
    ResBody: Body,
    ResBody::Error: Into<BoxError>,
{
    let (parts, body) = request.into_parts();
    let body = collect_body(body).await.map_err(Error::RequestBody)?;
    logger.on_request(&context, &Request::from_http(&parts, &body));

    let start = Instant::now();
    debug!(context = %context, "Awaiting inner service response");
    let response = match inner.call(http::Request::from_parts(parts, rebuffer(body))).await {
        Ok(response) => response,
        Err(e) => return Err(logger.on_boxed_error(&context, e.into(), start.elapsed())),
    };

    let (parts, body) = response.into_parts();
    let body = match collect_body(body).await {
        Ok(body) => body,
        Err(e) => {
            let e = Error::ResponseBody(e);
            return Err(logger.on_io_error(&context, e, start.elapsed()).into());
        }
    };

    let logged = logger.on_response(&context, Response::from_http(&parts, body), start.elapsed())?;
    let body = match logged.body {
        Some(body) => body.into_bytes()?,
        None => Bytes::new(),
    };
    Ok(http::Response::from_parts(parts, rebuffer(body)))
}
