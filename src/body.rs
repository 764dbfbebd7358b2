//! Body buffering utilities.
//!
//! The middleware logs whole bodies, so request and response bodies are read
//! into memory before the hooks run and handed on as [`Full`] bodies
//! afterwards. There is no streaming capture.

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full};
use tower::BoxError;

/// Reads an HTTP body to the end and returns its bytes.
///
/// # Examples
///
/// ```rust
/// use http_level_logger::body::collect_body;
/// use http_body_util::Full;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), tower::BoxError> {
/// let bytes = collect_body(Full::new(bytes::Bytes::from("Hello, World!"))).await?;
/// assert_eq!(bytes, "Hello, World!");
/// # Ok(())
/// # }
/// ```
pub async fn collect_body<B>(body: B) -> Result<Bytes, BoxError>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let collected = body.collect().await.map_err(Into::into)?;
    Ok(collected.to_bytes())
}

/// Wraps buffered bytes back into a body a downstream service can consume.
pub fn rebuffer(bytes: Bytes) -> Full<Bytes> {
    Full::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use http_body::Frame;
    use http_body_util::StreamBody;
    use std::io;

    #[tokio::test]
    async fn collects_chunked_body() {
        let chunks = stream::iter(vec![
            Ok::<_, io::Error>(Frame::data(Bytes::from("chunk1"))),
            Ok(Frame::data(Bytes::from("chunk2"))),
            Ok(Frame::data(Bytes::from("chunk3"))),
        ]);

        let bytes = collect_body(StreamBody::new(chunks)).await.unwrap();
        assert_eq!(bytes, "chunk1chunk2chunk3");
    }

    #[tokio::test]
    async fn collect_surfaces_stream_errors() {
        let chunks = stream::iter(vec![
            Ok(Frame::data(Bytes::from("partial"))),
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed")),
        ]);

        let err = collect_body(StreamBody::new(chunks)).await.unwrap_err();
        assert_eq!(err.to_string(), "connection closed");
    }

    #[tokio::test]
    async fn rebuffered_body_round_trips() {
        let large = Bytes::from("x".repeat(2048));
        let bytes = collect_body(rebuffer(large.clone())).await.unwrap();
        assert_eq!(bytes, large);
    }
}
