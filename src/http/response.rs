//! HTTP/1.1 response construction and serialization.

use bytes::{BufMut, BytesMut};

use super::{Headers, StatusCode, reason_phrase};

/// Boxed error type for handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// `Content-Type` written when the handler did not set one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// An HTTP response, ready to be serialized and sent.
///
/// The status is a plain `u16`, so codes without a canonical reason phrase
/// are allowed and serialize with `Unknown Status`.
///
/// # Examples
///
/// ```
/// use barehttp::http::{Response, StatusCode};
///
/// let response = Response::new("<h1>hi</h1>", StatusCode::Ok)
///     .header("Cache-Control", "no-store");
///
/// let bytes = response.serialize();
/// let text = std::str::from_utf8(&bytes).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\nContent-Length: 11\r\n"));
/// assert!(text.ends_with("\r\n\r\n<h1>hi</h1>"));
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// Creates a response with the given body and status.
    pub fn new(body: impl Into<Vec<u8>>, status: impl Into<u16>) -> Self {
        Self {
            status: status.into(),
            headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Creates a response whose body describes `status`.
    ///
    /// The body is never empty, even for codes without a reason phrase.
    pub fn error(status: impl Into<u16>) -> Self {
        let code = status.into();
        let title = format!("{code} {}", reason_phrase(code));
        let body = format!(
            "<html><head><title>{title}</title></head><body><h1>{title}</h1></body></html>"
        );
        Self::new(body, code)
    }

    /// Sets a response header, replacing any earlier value with that name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends a header in place, keeping earlier values with the same name.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.append(name, value);
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serializes the response into HTTP/1.1 wire format.
    ///
    /// Layout: status line, `Content-Length`, `Content-Type`, remaining
    /// headers in insertion order, blank line, body. `Content-Length` always
    /// reflects the body's byte length; a handler-supplied value is ignored.
    pub fn serialize(mut self) -> BytesMut {
        let content_length = self.body.len();

        self.headers.remove("content-length");
        let content_type = self
            .headers
            .get("content-type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        self.headers.remove("content-type");

        let estimated_size = 128 + self.headers.len() * 64 + content_length;
        let mut buf = BytesMut::with_capacity(estimated_size);

        buf.put(format!("HTTP/1.1 {} {}\r\n", self.status, reason_phrase(self.status)).as_bytes());
        buf.put(format!("Content-Length: {content_length}\r\n").as_bytes());
        buf.put(format!("Content-Type: {content_type}\r\n").as_bytes());
        buf.put(self.headers.to_string().as_bytes());

        // Header/body separator
        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_slice());

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(Vec::<u8>::new(), StatusCode::Ok)
    }
}

/// Values a handler may return.
///
/// `Ok(Some(_))` is served as-is, `Ok(None)` means the handler produced no
/// response and the server answers `404`, and `Err` stops the accept loop.
pub trait IntoReply {
    fn into_reply(self) -> Result<Option<Response>, BoxError>;
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Option<Response>, BoxError> {
        Ok(Some(self))
    }
}

impl IntoReply for Option<Response> {
    fn into_reply(self) -> Result<Option<Response>, BoxError> {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Option<Response>, BoxError> {
        Ok(None)
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> Result<Option<Response>, BoxError> {
        match self {
            Ok(reply) => reply.into_reply(),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_string(bytes: BytesMut) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // Returns (head, body) split at the first blank line.
    fn split(bytes: &[u8]) -> (String, Vec<u8>) {
        let pos = bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        (
            String::from_utf8(bytes[..pos].to_vec()).unwrap(),
            bytes[pos + 4..].to_vec(),
        )
    }

    fn declared_length(head: &str) -> usize {
        head.lines()
            .find_map(|l| l.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap()
    }

    #[test]
    fn simple_ok_response() {
        let s = to_string(Response::new("Hello", StatusCode::Ok).serialize());
        assert_eq!(
            s,
            "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Type: text/html; charset=utf-8\r\n\r\nHello"
        );
    }

    #[test]
    fn content_length_counts_bytes_not_chars() {
        let body = "héllo wörld ✓";
        let bytes = Response::new(body, 200u16).serialize();
        let (head, sent) = split(&bytes);
        assert_eq!(declared_length(&head), body.len());
        assert_eq!(sent, body.as_bytes());
    }

    #[test]
    fn binary_body_is_sent_verbatim() {
        let body: Vec<u8> = (0..=255).collect();
        let bytes = Response::new(body.clone(), 200u16).serialize();
        let (head, sent) = split(&bytes);
        assert_eq!(declared_length(&head), 256);
        assert_eq!(sent, body);
    }

    #[test]
    fn empty_body() {
        let s = to_string(Response::new("", StatusCode::NoContent).serialize());
        assert!(s.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(s.contains("Content-Length: 0\r\n"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn custom_content_type_replaces_default() {
        let r = Response::new("{}", 200u16).header("content-type", "application/json");
        let s = to_string(r.serialize());
        assert!(s.contains("Content-Type: application/json\r\n"));
        assert!(!s.contains("text/html"));
    }

    #[test]
    fn handler_content_length_is_overridden() {
        let r = Response::new("abc", 200u16).header("Content-Length", "999");
        let s = to_string(r.serialize());
        assert!(s.contains("Content-Length: 3\r\n"));
        assert!(!s.contains("999"));
    }

    #[test]
    fn extra_headers_follow_content_type() {
        let mut r = Response::new("ok", 200u16);
        r.add_header("Set-Cookie", "a=1");
        r.add_header("Set-Cookie", "b=2");
        let s = to_string(r.serialize());
        assert!(s.contains("Content-Type: text/html; charset=utf-8\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\n\r\n"));
    }

    #[test]
    fn unmapped_status_uses_fallback_phrase() {
        let s = to_string(Response::new("teapot-ish", 299u16).serialize());
        assert!(s.starts_with("HTTP/1.1 299 Unknown Status\r\n"));
    }

    #[test]
    fn error_response_describes_status() {
        let r = Response::error(StatusCode::NotFound);
        assert_eq!(r.status(), 404);
        assert!(!r.body().is_empty());

        let s = to_string(r.serialize());
        assert!(s.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(s.contains("<h1>404 Not Found</h1>"));
    }

    #[test]
    fn error_response_for_unknown_code() {
        let r = Response::error(799u16);
        assert!(String::from_utf8_lossy(r.body()).contains("799 Unknown Status"));
    }

    #[test]
    fn reply_conversions() {
        assert!(Response::default().into_reply().unwrap().is_some());
        assert!(None::<Response>.into_reply().unwrap().is_none());
        assert!(().into_reply().unwrap().is_none());

        let ok: Result<Response, std::io::Error> = Ok(Response::default());
        assert!(ok.into_reply().unwrap().is_some());

        let err: Result<Response, std::io::Error> = Err(std::io::Error::other("boom"));
        assert_eq!(err.into_reply().unwrap_err().to_string(), "boom");
    }
}
