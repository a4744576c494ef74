use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Request},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{verify_token, Decision, Policy, Principal};
use crate::config;
use crate::error::ApiError;

/// Verifies a bearer token if one was sent and stores its [`Principal`] in the
/// request extensions. A missing or invalid token is not an error; the request
/// simply continues without a principal.
pub async fn authenticate_jwt(mut request: Request, next: Next) -> Response {
    if let Some(token) = extract_token(request.headers()) {
        match verify_token(&token) {
            Ok(claims) => {
                tracing::debug!("Authenticated {} (admin: {})", claims.username, claims.is_admin);
                request.extensions_mut().insert(Principal::from(claims));
            }
            Err(e) => tracing::debug!("Ignoring token: {}", e),
        }
    }

    next.run(request).await
}

/// Token from the Authorization header, with any `Bearer `/`bearer ` prefix removed.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = raw
        .strip_prefix("Bearer ")
        .or_else(|| raw.strip_prefix("bearer "))
        .unwrap_or(raw)
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Route layer: a principal must be present.
pub async fn ensure_logged_in(request: Request, next: Next) -> Result<Response, ApiError> {
    enforce(Policy::LoggedIn, &request, None)?;
    Ok(next.run(request).await)
}

/// Route layer: the principal must be an admin.
pub async fn ensure_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    enforce(Policy::Admin, &request, None)?;
    Ok(next.run(request).await)
}

/// Route layer: the principal must be an admin or the user named by `:username`.
pub async fn ensure_admin_or_user(
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    enforce(Policy::AdminOrOwner, &request, params.get("username").map(String::as_str))?;
    Ok(next.run(request).await)
}

fn enforce(policy: Policy, request: &Request, owner: Option<&str>) -> Result<(), ApiError> {
    let principal = request.extensions().get::<Principal>();

    match policy.decide(principal, owner) {
        Decision::Allow => {
            if config::config().security.enable_audit_logging {
                tracing::info!(
                    "{:?} allowed {} {} for {}",
                    policy,
                    request.method(),
                    request.uri().path(),
                    principal.map(|p| p.identifier.as_str()).unwrap_or("-")
                );
            }
            Ok(())
        }
        Decision::Deny(reason) => {
            tracing::warn!(
                "{:?} denied {} {} ({:?})",
                policy,
                request.method(),
                request.uri().path(),
                reason
            );
            Err(reason.into())
        }
    }
}

/// The request's principal, if a valid token was presented.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<Principal>);

impl CurrentUser {
    pub fn name(&self) -> &str {
        self.0.as_ref().map(|p| p.identifier.as_str()).unwrap_or("anonymous")
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(parts.extensions.get::<Principal>().cloned()))
    }
}
