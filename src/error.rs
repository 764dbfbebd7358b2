use tower::BoxError;

/// Errors raised while buffering bodies for logging.
///
/// None of these come from formatting; a body that cannot be shown as text
/// is logged with a placeholder instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to buffer response body: {0}")]
    BodyRead(#[from] std::io::Error),

    #[error("failed to read request body: {0}")]
    RequestBody(#[source] BoxError),

    #[error("failed to read response body: {0}")]
    ResponseBody(#[source] BoxError),
}
