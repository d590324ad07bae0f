//! Response type shared by handlers and the transport, plus error bodies

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use hyper::Response;

use crate::error::{ExecutionResult, ServerError};

/// Response body type written to the wire
pub type RespBody = Full<Bytes>;
pub type Resp = Response<RespBody>;

/// Response produced by a resource handler
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::ok()
    }
}

impl HttpResponse {
    pub fn ok() -> Self {
        Self::with_status(StatusCode::OK)
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a header; invalid values are skipped
    pub fn with_header(mut self, name: http::header::HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .with_header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .with_body(body.into())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_hyper(self) -> Resp {
        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Build a JSON error response with a uniform shape
/// {
///   "error": "snake_code",
///   "message": "Human readable detail"
/// }
pub fn json_error(status: StatusCode, code: &str, message: &str) -> Resp {
    let body = serde_json::json!({ "error": code, "message": message }).to_string();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Error response for a failed request
pub fn error_response(error: &ServerError) -> Resp {
    let mut response = json_error(error.status_code(), error.code(), &error.to_string());
    if error.is_retryable() {
        response.headers_mut().insert(http::header::RETRY_AFTER, HeaderValue::from_static("1"));
    }
    response
}

/// 404 for a (method, path) pair with no registered handler
pub fn not_found(method: &http::Method, path: &str) -> Resp {
    json_error(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("No handler registered for {} {}", method, path),
    )
}

/// Turn a completed request into what goes back on the wire
pub fn outcome_to_response(result: ExecutionResult, response: Option<HttpResponse>) -> Resp {
    match result {
        Ok(()) => response.unwrap_or_default().into_hyper(),
        Err(error) => error_response(&error),
    }
}
