//! Authorization collaborator
//!
//! Every request is gated through an [`AuthorizationProxy`] before its handler
//! runs. The decision logic lives outside this crate; the core only builds the
//! request from headers and routes the outcome.

use async_trait::async_trait;

use crate::error::{Result, ServerError};
use crate::http::{Http2Request, AUTHORIZATION_HEADER, CLAIMED_IDENTITY_HEADER};

/// Failure code reported by [`PassThroughAuthorizationProxy`] for a missing identity
pub const MISSING_CLAIMED_IDENTITY: u64 = 403;

/// Identity material extracted from an incoming request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub claimed_identity: String,
    pub authorization_token: String,
}

impl AuthorizationRequest {
    pub fn from_request(request: &Http2Request) -> Self {
        Self {
            claimed_identity: request.header_str(CLAIMED_IDENTITY_HEADER).unwrap_or_default().to_string(),
            authorization_token: request.header_str(AUTHORIZATION_HEADER).unwrap_or_default().to_string(),
        }
    }
}

/// Identity the authorization collaborator vouched for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub authorized_domain: String,
}

/// Authorization provider trait
///
/// Implement this trait to plug an authorization decision into the server.
/// Failures should use [`ServerError::AuthorizationFailed`] (or
/// [`ServerError::Retry`] for transient trouble).
#[async_trait]
pub trait AuthorizationProxy: Send + Sync {
    async fn authorize(&self, request: AuthorizationRequest) -> Result<AuthorizationResponse>;
}

/// Authorizes any caller that claims an identity, echoing it as the authorized domain
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughAuthorizationProxy;

#[async_trait]
impl AuthorizationProxy for PassThroughAuthorizationProxy {
    async fn authorize(&self, request: AuthorizationRequest) -> Result<AuthorizationResponse> {
        if request.claimed_identity.is_empty() {
            return Err(ServerError::AuthorizationFailed(MISSING_CLAIMED_IDENTITY));
        }
        Ok(AuthorizationResponse { authorized_domain: request.claimed_identity })
    }
}
