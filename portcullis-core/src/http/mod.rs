//! HTTP-facing types: requests, responses and the handler registry
//!
//! - [`request`] - transport-level [`Http2Request`] and handler-level [`HttpRequest`]
//! - [`response`] - [`HttpResponse`] and JSON error bodies
//! - [`router`] - exact (method, path) [`HandlerRegistry`]

pub mod request;
pub mod response;
pub mod router;

pub use request::{
    Http2Request, HttpRequest, RequestBody, RequestId, AUTHORIZATION_HEADER,
    CLAIMED_IDENTITY_HEADER,
};
pub use response::{error_response, json_error, not_found, outcome_to_response, HttpResponse};
pub use router::{handler_fn, HandlerRegistry, HttpHandler};
