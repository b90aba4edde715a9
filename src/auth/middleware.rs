//! Bearer-token extraction for protected routes.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::AuthContext;
use crate::app::AppState;
use crate::error::ErrorResponse;

/// Extractor that rejects the request unless it carries a valid JWT.
///
/// Handlers take this as an argument; the verified identity is available
/// through `auth.actor` (and the rest of [`AuthContext`] via deref).
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

impl std::ops::Deref for RequireAuth {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct AuthRejection {
    message: &'static str,
}

impl AuthRejection {
    fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: "UNAUTHORIZED".to_string(),
            message: self.message.to_string(),
            retryable: None,
        };
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, AuthRejection> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AuthRejection::new("Missing authorization token"))?
        .to_str()
        .map_err(|_| AuthRejection::new("Invalid authorization header"))?;

    match header.strip_prefix("Bearer ") {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(AuthRejection::new("Invalid authorization format")),
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = state.jwks_cache.verify_token(token).await.map_err(|e| {
            tracing::warn!(error = %e, "JWT verification failed");
            AuthRejection::new("Invalid or expired token")
        })?;

        let context = AuthContext::from_claims(&claims).map_err(|e| {
            tracing::warn!(error = %e, "Rejected token with unusable claims");
            AuthRejection::new("Invalid or expired token")
        })?;

        Ok(RequireAuth(context))
    }
}
