//! Default request handler used by the `barehttp` binary.
//!
//! Logs each request and answers with an HTML page listing the method, path,
//! and decoded query parameters.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info};

use crate::http::{Request, Response, StatusCode};

#[derive(Debug, Serialize)]
struct EchoReport<'a> {
    method: &'a str,
    uri: &'a str,
    parameters: BTreeMap<&'a str, &'a str>,
}

/// Echoes the request back as a small HTML page.
pub async fn echo(request: Request) -> Response {
    info!("{} {}", request.method(), request.uri());

    let report = EchoReport {
        method: request.method().as_str(),
        uri: request.uri(),
        parameters: request
            .parameters()
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect(),
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => Response::new(
            format!(
                "<pre>Method: {}<hr>Query Params:<br><br>{}</pre>",
                escape_html(report.method),
                escape_html(&json)
            ),
            StatusCode::Ok,
        ),
        Err(e) => {
            error!(error = %e, "failed to encode echo report");
            Response::error(StatusCode::InternalServerError)
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_of(response: &Response) -> String {
        String::from_utf8(response.body().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn reports_method_and_parameters() {
        let request = Request::parse(b"get /search?q=hello+world&page=2 HTTP/1.1\r\n\r\n");
        let response = echo(request).await;

        assert_eq!(response.status(), 200);
        let body = body_of(&response);
        assert!(body.starts_with("<pre>Method: GET<hr>"), "{body}");
        assert!(body.contains("&quot;q&quot;: &quot;hello world&quot;"), "{body}");
        assert!(body.contains("&quot;page&quot;: &quot;2&quot;"), "{body}");
    }

    #[tokio::test]
    async fn markup_in_parameters_is_escaped() {
        let request = Request::parse(b"GET /?x=%3Cscript%3E HTTP/1.1\r\n\r\n");
        let body = body_of(&echo(request).await);
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[test]
    fn escape() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
