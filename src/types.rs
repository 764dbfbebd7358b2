//! Data types describing a single logged HTTP call.
//!
//! These are transient values scoped to one call: the outgoing [`Request`],
//! the incoming [`Response`], and the [`CallContext`] used to tag every line
//! written for that call.

use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, Method};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};

/// Identifier of the remote call being logged, used as the line tag.
///
/// Attach it to an [`http::Request`] as an extension to control the tag the
/// middleware uses; requests without one are tagged `"METHOD path"`.
///
/// # Examples
///
/// ```rust
/// use http_level_logger::CallContext;
///
/// let request = http::Request::builder()
///     .uri("http://api.example.com/users")
///     .extension(CallContext::new("UserApi#list()"))
///     .body(())
///     .unwrap();
/// assert_eq!(
///     request.extensions().get::<CallContext>().map(CallContext::as_str),
///     Some("UserApi#list()")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallContext(Cow<'static, str>);

impl CallContext {
    pub fn new(context: impl Into<Cow<'static, str>>) -> Self {
        Self(context.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the context of an [`http::Request`]: the attached extension,
    /// or `"METHOD path"` when there is none.
    pub fn of<B>(request: &http::Request<B>) -> Cow<'_, str> {
        match request.extensions().get::<CallContext>() {
            Some(context) => Cow::Borrowed(context.as_str()),
            None => Cow::Owned(format!("{} {}", request.method(), request.uri().path())),
        }
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Character set used to render a request body as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Utf8,
    UsAscii,
    Latin1,
}

impl Charset {
    /// Looks up a charset by its (case-insensitive) IANA name or common alias.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim().trim_matches('"');
        match label.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "us-ascii" | "ascii" => Some(Self::UsAscii),
            "iso-8859-1" | "iso8859-1" | "latin1" | "l1" => Some(Self::Latin1),
            _ => None,
        }
    }

    /// Derives the charset from a `Content-Type` value.
    ///
    /// An explicit `charset=` parameter wins; JSON media types are UTF-8 by
    /// definition; anything else is unknown.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mut params = content_type.split(';');
        let media_type = params.next().unwrap_or_default().trim().to_ascii_lowercase();

        for param in params {
            if let Some((name, value)) = param.split_once('=') {
                if name.trim().eq_ignore_ascii_case("charset") {
                    return Self::from_label(value);
                }
            }
        }

        if media_type == "application/json" || media_type.ends_with("+json") {
            Some(Self::Utf8)
        } else {
            None
        }
    }

    /// Decodes `bytes`, replacing anything malformed with U+FFFD.
    pub fn decode_lossy<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes),
            Self::UsAscii => Cow::Owned(
                bytes
                    .iter()
                    .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
                    .collect(),
            ),
            Self::Latin1 => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Header multimap that keeps names in first-insertion order and every value
/// per name in the order it was added.
///
/// Names are kept verbatim (no case folding), so a header added as
/// `Content-Type` is logged as `Content-Type`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value under `name`, after any values already present.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((name, vec![value])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Iterates `(name, value)` pairs, one per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|(name, values)| {
            values.iter().map(move |value| (name.as_str(), value.as_str()))
        })
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts an [`http::HeaderMap`]. Names come out lowercase, as `http`
    /// stores them; values that are not visible ASCII are decoded lossily.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = Self::new();
        for name in map.keys() {
            for value in map.get_all(name) {
                let value = match value.to_str() {
                    Ok(value) => value.to_owned(),
                    Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
                };
                headers.append(name.as_str(), value);
            }
        }
        headers
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Outgoing request as seen by the request hook.
///
/// # Examples
///
/// ```rust
/// use http_level_logger::{Charset, Request};
///
/// let request = Request::new(http::Method::POST, "http://api.example.com/users")
///     .header("Content-Type", "application/json")
///     .body(r#"{"name":"ada"}"#, Some(Charset::Utf8));
/// assert_eq!(request.body_len(), 14);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
    pub charset: Option<Charset>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
            charset: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>, charset: Option<Charset>) -> Self {
        self.body = Some(body.into());
        self.charset = charset;
        self
    }

    /// Body length in bytes, 0 when there is no body.
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, Bytes::len)
    }

    /// Builds the logged view of an outgoing `http` request whose body has
    /// already been buffered. An empty body counts as no body.
    pub fn from_http(parts: &http::request::Parts, body: &Bytes) -> Self {
        let charset = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(Charset::from_content_type);

        Self {
            method: parts.method.clone(),
            url: parts.uri.to_string(),
            headers: Headers::from_header_map(&parts.headers),
            body: (!body.is_empty()).then(|| body.clone()),
            charset,
        }
    }
}

/// Body of an incoming response: either already in memory, or a blocking
/// byte stream that has not been read yet.
pub enum ResponseBody {
    Buffered(Bytes),
    Reader(Box<dyn Read + Send>),
}

impl ResponseBody {
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::Reader(Box::new(reader))
    }

    /// Reads the whole body into memory. A buffered body is returned as is.
    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Self::Buffered(bytes) => Ok(bytes),
            Self::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Buffered(bytes) => Some(bytes),
            Self::Reader(_) => None,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered(bytes) => f.debug_tuple("Buffered").field(bytes).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::Buffered(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Buffered(bytes.into())
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Buffered(text.into())
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        Self::Buffered(Bytes::from_static(text.as_bytes()))
    }
}

/// Incoming response as seen by the response hook.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub reason: Option<String>,
    pub headers: Headers,
    pub body: Option<ResponseBody>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: None,
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the logged view of an `http` response whose body has already
    /// been buffered. The reason phrase is the canonical one for the status.
    pub fn from_http(parts: &http::response::Parts, body: Bytes) -> Self {
        Self {
            status: parts.status.as_u16(),
            reason: parts.status.canonical_reason().map(str::to_owned),
            headers: Headers::from_header_map(&parts.headers),
            body: Some(ResponseBody::Buffered(body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn headers_keep_insertion_order_and_group_values() {
        let headers: Headers = [
            ("Accept", "text/plain"),
            ("X-Trace", "a"),
            ("Accept", "application/json"),
        ]
        .into_iter()
        .collect();

        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                ("Accept", "text/plain"),
                ("Accept", "application/json"),
                ("X-Trace", "a"),
            ]
        );
        assert_eq!(headers.get("X-Trace"), Some(&["a".to_string()][..]));
        assert_eq!(headers.get("x-trace"), None);
    }

    #[test]
    fn headers_from_header_map_collects_repeated_values() {
        let mut map = HeaderMap::new();
        map.insert("content-type", HeaderValue::from_static("text/plain"));
        map.append("set-cookie", HeaderValue::from_static("a=1"));
        map.append("set-cookie", HeaderValue::from_static("b=2"));

        let headers = Headers::from_header_map(&map);
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                ("content-type", "text/plain"),
                ("set-cookie", "a=1"),
                ("set-cookie", "b=2"),
            ]
        );
    }

    #[test]
    fn charset_from_content_type() {
        assert_eq!(
            Charset::from_content_type("text/html; charset=ISO-8859-1"),
            Some(Charset::Latin1)
        );
        assert_eq!(
            Charset::from_content_type("text/plain;charset=\"utf-8\""),
            Some(Charset::Utf8)
        );
        assert_eq!(Charset::from_content_type("application/json"), Some(Charset::Utf8));
        assert_eq!(
            Charset::from_content_type("application/problem+json"),
            Some(Charset::Utf8)
        );
        assert_eq!(Charset::from_content_type("application/octet-stream"), None);
        assert_eq!(Charset::from_content_type("text/plain; charset=koi8-r"), None);
    }

    #[test]
    fn charset_decoding_is_lossy() {
        assert_eq!(Charset::Utf8.decode_lossy(b"caf\xc3\xa9"), "café");
        assert_eq!(Charset::Utf8.decode_lossy(b"a\xffb"), "a\u{fffd}b");
        assert_eq!(Charset::UsAscii.decode_lossy(b"a\xe9b"), "a\u{fffd}b");
        assert_eq!(Charset::Latin1.decode_lossy(b"caf\xe9"), "café");
    }

    #[test]
    fn reader_body_is_materialized() {
        let body = ResponseBody::from_reader(io::Cursor::new(b"streamed".to_vec()));
        assert!(body.as_bytes().is_none());
        assert_eq!(body.into_bytes().unwrap(), Bytes::from_static(b"streamed"));
    }

    #[test]
    fn call_context_falls_back_to_method_and_path() {
        let request = http::Request::builder()
            .method(Method::DELETE)
            .uri("http://api.example.com/users/7?force=true")
            .body(())
            .unwrap();
        assert_eq!(CallContext::of(&request), "DELETE /users/7");

        let request = http::Request::builder()
            .uri("/users")
            .extension(CallContext::new("UserApi#list()"))
            .body(())
            .unwrap();
        assert_eq!(CallContext::of(&request), "UserApi#list()");
    }

    #[test]
    fn request_from_http_treats_empty_body_as_absent() {
        let (parts, ()) = http::Request::builder()
            .method(Method::GET)
            .uri("http://api.example.com/")
            .header("content-type", "application/json")
            .body(())
            .unwrap()
            .into_parts();

        let request = Request::from_http(&parts, &Bytes::new());
        assert_eq!(request.body, None);
        assert_eq!(request.charset, Some(Charset::Utf8));
        assert_eq!(request.url, "http://api.example.com/");
    }
}
