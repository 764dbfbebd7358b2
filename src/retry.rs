//! Retry observation.
//!
//! [`LoggingRetryPolicy`] wraps a caller-supplied [`tower::retry::Policy`]
//! and writes the retry line whenever that policy decides to try again. It
//! never changes the decision.

use crate::logger::RequestResponseLogger;
use crate::sink::{LogSink, TracingSink};
use crate::types::CallContext;
use std::sync::Arc;
use tower::retry::Policy;

/// Retry policy wrapper that logs each retry of an [`http::Request`].
///
/// Place the retry layer outside the logging layer so every attempt is
/// logged as a call of its own, with a `---> RETRYING` line between them:
///
/// ```rust,ignore
/// let client = ServiceBuilder::new()
///     .layer(RetryLayer::new(LoggingRetryPolicy::new(policy, logger.clone())))
///     .layer(HttpLoggerLayer::from_shared(logger))
///     .service(transport);
/// ```
pub struct LoggingRetryPolicy<P, S = TracingSink> {
    inner: P,
    logger: Arc<RequestResponseLogger<S>>,
}

impl<P, S> LoggingRetryPolicy<P, S> {
    pub fn new(inner: P, logger: Arc<RequestResponseLogger<S>>) -> Self {
        Self { inner, logger }
    }

    pub fn get_ref(&self) -> &P {
        &self.inner
    }
}

impl<P: Clone, S> Clone for LoggingRetryPolicy<P, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            logger: Arc::clone(&self.logger),
        }
    }
}

impl<P, S, B, Res, E> Policy<http::Request<B>, Res, E> for LoggingRetryPolicy<P, S>
where
    P: Policy<http::Request<B>, Res, E>,
    S: LogSink,
{
    type Future = P::Future;

    fn retry(
        &mut self,
        req: &mut http::Request<B>,
        result: &mut Result<Res, E>,
    ) -> Option<Self::Future> {
        let future = self.inner.retry(req, result)?;
        self.logger.on_retry(&CallContext::of(req));
        Some(future)
    }

    fn clone_request(&mut self, req: &http::Request<B>) -> Option<http::Request<B>> {
        self.inner.clone_request(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{CapturingSink, Severity};
    use std::future::{ready, Ready};

    #[derive(Clone)]
    struct RetryErrors {
        remaining: usize,
    }

    impl Policy<http::Request<()>, u16, &'static str> for RetryErrors {
        type Future = Ready<()>;

        fn retry(
            &mut self,
            _req: &mut http::Request<()>,
            result: &mut Result<u16, &'static str>,
        ) -> Option<Self::Future> {
            if result.is_err() && self.remaining > 0 {
                self.remaining -= 1;
                Some(ready(()))
            } else {
                None
            }
        }

        fn clone_request(&mut self, req: &http::Request<()>) -> Option<http::Request<()>> {
            let mut clone = http::Request::new(());
            *clone.method_mut() = req.method().clone();
            *clone.uri_mut() = req.uri().clone();
            *clone.extensions_mut() = req.extensions().clone();
            Some(clone)
        }
    }

    #[test]
    fn logs_only_when_inner_policy_retries() {
        let sink = CapturingSink::new(Severity::Info);
        let logger = Arc::new(RequestResponseLogger::with_sink(sink.clone()));
        let mut policy = LoggingRetryPolicy::new(RetryErrors { remaining: 1 }, logger);

        let mut req = http::Request::builder()
            .uri("/users")
            .extension(CallContext::new("UserApi#list()"))
            .body(())
            .unwrap();

        let mut ok: Result<u16, &'static str> = Ok(200);
        let mut failed: Result<u16, &'static str> = Err("boom");

        assert!(policy.retry(&mut req, &mut ok).is_none());
        assert!(policy.retry(&mut req, &mut failed).is_some());
        assert!(policy.retry(&mut req, &mut failed).is_none());

        assert_eq!(sink.lines_at(Severity::Info), vec!["[UserApi#list] ---> RETRYING"]);
    }

    #[test]
    fn clone_request_delegates() {
        let sink = CapturingSink::new(Severity::Info);
        let logger = Arc::new(RequestResponseLogger::with_sink(sink));
        let mut policy = LoggingRetryPolicy::new(RetryErrors { remaining: 0 }, logger);

        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri("/users")
            .body(())
            .unwrap();

        let clone = policy.clone_request(&req).unwrap();
        assert_eq!(clone.method(), http::Method::POST);
        assert_eq!(CallContext::of(&clone), "POST /users");
    }
}
