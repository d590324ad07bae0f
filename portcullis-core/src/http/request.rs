//! Request types at the transport and handler boundaries

use bytes::Bytes;
use http::{HeaderMap, Method};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use uuid::Uuid;

use crate::error::ServerError;

/// Header carrying the identity the caller claims to act for
pub const CLAIMED_IDENTITY_HEADER: &str = "x-gscp-claimed-identity";

/// Header carrying the caller's credential
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Streaming request body as delivered by the transport
pub type RequestBody = UnsyncBoxBody<Bytes, ServerError>;

/// Opaque per-request identifier, unique for the lifetime of the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw request handed over by the transport, body possibly still arriving
pub struct Http2Request {
    pub id: RequestId,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    body: Option<RequestBody>,
}

impl Http2Request {
    pub fn new(id: RequestId, method: Method, path: impl Into<String>, body: RequestBody) -> Self {
        Self { id, method, path: path.into(), query: None, headers: HeaderMap::new(), body: Some(body) }
    }

    /// Build from hyper request parts and a streaming body
    pub fn from_parts<B>(id: RequestId, parts: http::request::Parts, body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: std::fmt::Display,
    {
        let body = body.map_err(|e| ServerError::BodyReadFailed(e.to_string())).boxed_unsync();
        Self {
            id,
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body: Some(body),
        }
    }

    /// Request with an already complete body
    pub fn with_bytes(
        id: RequestId,
        method: Method,
        path: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        let body = Full::new(body.into())
            .map_err(|never| -> ServerError { match never {} })
            .boxed_unsync();
        Self::new(id, method, path, body)
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: &str) -> Self {
        if let Ok(value) = http::HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Take the streaming body; later calls return `None`
    pub fn take_body(&mut self) -> Option<RequestBody> {
        self.body.take()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl std::fmt::Debug for Http2Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Http2Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_pending", &self.body.is_some())
            .finish()
    }
}

/// Request as seen by a resource handler: body fully received, caller authorized
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub id: RequestId,
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Domain the authorization collaborator vouched for
    pub authorized_domain: Option<String>,
}

impl HttpRequest {
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
