//! Request authentication middleware.
//!
//! Three policy variants over the same token verification: mandatory
//! (`authenticate_token`), role-gated (`require_role`, composed after
//! mandatory), and optional (`optional_auth`, which never rejects).
//! The admin console has its own mandatory variant verifying against
//! the admin secret.
//!
//! Every route in this crate's router is either public or mandatory;
//! `optional_auth` is exported for content surfaces (events, teachings,
//! prayer feeds) that serve both anonymous and signed-in views.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::auth::{AuthError, TokenKind};
use crate::db::{Role, User, UserResponse};
use crate::AppState;

use super::error::ApiError;

/// The authenticated identity attached to a request. Always sanitized;
/// the password hash never reaches a handler.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: UserResponse,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Verify a token and load the account it references. Absent and
/// deactivated accounts are reported identically so the response does
/// not reveal which of the two it was.
async fn resolve_user(
    state: &AppState,
    token: &str,
    kind: TokenKind,
) -> Result<User, AuthError> {
    let claims = state.tokens.verify(token, kind)?;
    let user = User::find_by_id(&state.db, &claims.user_id).await?;
    match user {
        Some(user) if user.is_active => Ok(user),
        _ => Err(AuthError::AccountNotFound),
    }
}

/// Best-effort last-seen update. A failed write is logged and does not
/// fail the request.
async fn touch_last_seen(state: &AppState, user_id: &str) {
    if let Err(e) = User::touch_last_seen(&state.db, user_id).await {
        tracing::warn!(user_id, "Failed to update last_seen: {e}");
    }
}

/// Mandatory authentication: requires a valid bearer access token for
/// an active account, attaches the sanitized user, and updates
/// last-seen.
pub async fn authenticate_token(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let user = resolve_user(&state, token, TokenKind::Access).await?;
    touch_last_seen(&state, &user.id).await;

    request.extensions_mut().insert(CurrentUser { user: user.into() });
    Ok(next.run(request).await)
}

/// Optional authentication: attaches an identity when the token checks
/// out, otherwise the request proceeds anonymously. Never rejects.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(request.headers()) {
        match resolve_user(&state, token, TokenKind::Access).await {
            Ok(user) => {
                touch_last_seen(&state, &user.id).await;
                request.extensions_mut().insert(CurrentUser { user: user.into() });
            }
            Err(e) => {
                tracing::debug!("Optional auth failed: {e}");
            }
        }
    }
    next.run(request).await
}

/// Role gate, composed after `authenticate_token`. The allow-list is
/// exact-match: listing `Pastor` does not admit `Admin` unless `Admin`
/// is also listed.
pub fn require_role<const N: usize>(
    allowed: [Role; N],
) -> impl Fn(Request<Body>, Next) -> BoxFuture<'static, Response> + Clone {
    move |request, next| {
        Box::pin(async move {
            let Some(current) = request.extensions().get::<CurrentUser>() else {
                return ApiError::unauthorized("Authentication required").into_response();
            };
            if !allowed.contains(&current.user.role) {
                return ApiError::forbidden("Insufficient permissions").into_response();
            }
            next.run(request).await
        })
    }
}

/// Mandatory authentication for the admin console. Verifies against
/// the admin secret and requires the resolved account's role to be
/// exactly `admin`. Deactivated admin accounts are rejected like any
/// other deactivated account.
pub async fn authenticate_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Access token required"))?;

    let user = resolve_user(&state, token, TokenKind::Admin).await?;
    if user.role != Role::Admin {
        return Err(AuthError::PermissionDenied.into());
    }
    touch_last_seen(&state, &user.id).await;

    request.extensions_mut().insert(CurrentUser { user: user.into() });
    Ok(next.run(request).await)
}
