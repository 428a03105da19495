//! Lenient HTTP/1.x request parsing.
//!
//! The parser never fails: whatever arrives in the first read chunk is turned
//! into a [`Request`], and fields it cannot make sense of are left empty.

use std::collections::HashMap;

use bytes::Bytes;
use tracing::trace;

use super::{Headers, Method};

/// Outcome of reading a single header line.
#[derive(Debug, PartialEq, Eq)]
enum HeaderLine<'a> {
    Parsed(&'a str, &'a str),
    Skipped(&'a str),
}

impl<'a> HeaderLine<'a> {
    // Only `Name: value` with a colon-space separator counts; the split is on
    // the first occurrence so values may themselves contain ": ".
    fn classify(line: &'a str) -> Self {
        match line.split_once(": ") {
            Some((key, value)) => HeaderLine::Parsed(key, value),
            None => HeaderLine::Skipped(line),
        }
    }
}

/// A parsed HTTP request.
///
/// Created by [`Request::parse`] from the raw bytes read off a client socket,
/// or directly with [`Request::new`].
///
/// # Examples
///
/// ```
/// use barehttp::http::Request;
///
/// let raw = b"get /search?q=hello+world&lang=en HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let request = Request::parse(raw);
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.uri(), "/search");
/// assert_eq!(request.param("q"), Some("hello world"));
/// assert_eq!(request.header("Host"), Some("localhost"));
/// assert_eq!(request.header("Accept"), None);
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    parameters: HashMap<String, String>,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Builds a request from a method token, a URI that may carry a query
    /// string, and already-parsed headers.
    pub fn new(method: &str, uri: &str, headers: Headers) -> Self {
        let Ok(method) = method.parse::<Method>();

        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (uri.to_owned(), None),
        };

        let parameters = query.as_deref().map(decode_query).unwrap_or_default();

        Self {
            method,
            path,
            query,
            parameters,
            headers,
            body: Bytes::new(),
        }
    }

    /// Parses a raw request chunk.
    ///
    /// The first line is read as `METHOD URI [anything]`; the version token
    /// is not checked. Every following non-blank line is a header if it
    /// contains `": "` and is dropped otherwise. This includes lines after
    /// the blank line, so a body line such as `Key: text` also lands in the
    /// headers. The bytes after the first blank line are kept as the body.
    ///
    /// Input that is empty or has no request line yields an empty method and
    /// an empty URI.
    pub fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);

        let mut lines = text.split('\n');
        let request_line = lines.next().unwrap_or_default().trim();
        let mut tokens = request_line.split_whitespace();
        let method = tokens.next().unwrap_or_default();
        let uri = tokens.next().unwrap_or_default();

        let mut headers = Headers::new();
        for line in lines.map(str::trim).filter(|l| !l.is_empty()) {
            match HeaderLine::classify(line) {
                HeaderLine::Parsed(key, value) => headers.insert(key, value),
                HeaderLine::Skipped(raw_line) => {
                    trace!(line = raw_line, "skipping malformed header line");
                }
            }
        }

        let mut request = Self::new(method, uri, headers);
        request.body = Bytes::copy_from_slice(body_of(raw));
        request
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path, without the query string.
    pub fn uri(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns a header value by name, or `None` if the client did not send it.
    ///
    /// Names match ASCII case-insensitively, and spellings that differ only
    /// in case share one entry: for `Host: a` followed by `host: b` this
    /// returns `Some("b")`.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns a decoded query parameter, or `None` if absent.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    /// Returns whatever body bytes arrived in the same read as the headers.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

// Bytes after the first blank line, or nothing if there is none.
fn body_of(raw: &[u8]) -> &[u8] {
    let crlf = raw.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4);
    let lf = raw.windows(2).position(|w| w == b"\n\n").map(|p| p + 2);

    match (crlf, lf) {
        (Some(a), Some(b)) => &raw[a.min(b)..],
        (Some(start), None) | (None, Some(start)) => &raw[start..],
        (None, None) => &[],
    }
}

/// Decodes an `application/x-www-form-urlencoded` query string.
///
/// Later occurrences of a key overwrite earlier ones.
fn decode_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
