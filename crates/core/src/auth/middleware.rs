//! Authentication middleware and extractors.
//!
//! `require_auth` verifies the bearer token and stores its [`Claims`] in the
//! request extensions; `require_role` and [`CurrentUser`] read them back.
//!
//! # Example
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/products", post(create_product))
//!     // Runs second: role check against the attached claims
//!     .route_layer(middleware::from_fn_with_state(
//!         RoleGate::new(UserRole::CATALOG_WRITERS),
//!         require_role,
//!     ))
//!     // Runs first: token verification
//!     .route_layer(middleware::from_fn_with_state(keys, require_auth))
//! ```

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{Claims, TokenError, TokenKeys, bearer_token};
use crate::api::ApiResponse;
use crate::types::UserRole;

/// Why a request was refused by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No bearer token was supplied.
    MissingToken,
    /// The token failed verification.
    InvalidToken,
    /// The token has expired.
    ExpiredToken,
    /// The token is valid but its role is not allowed here.
    Forbidden,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingToken => (StatusCode::UNAUTHORIZED, "Authentication required"),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            Self::ExpiredToken => (StatusCode::UNAUTHORIZED, "Token expired"),
            Self::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
        };
        (status, Json(ApiResponse::error(message))).into_response()
    }
}

/// Middleware that rejects requests without a valid bearer token.
///
/// On success the decoded [`Claims`] are inserted into the request extensions.
pub async fn require_auth(
    State(keys): State<TokenKeys>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return AuthRejection::MissingToken.into_response();
    };

    match keys.verify(token) {
        Ok(claims) => {
            tracing::Span::current().record("user_id", claims.sub.as_str());
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(TokenError::Expired) => AuthRejection::ExpiredToken.into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "rejected bearer token");
            AuthRejection::InvalidToken.into_response()
        }
    }
}

/// Set of roles allowed past [`require_role`].
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [UserRole],
}

impl RoleGate {
    #[must_use]
    pub const fn new(allowed: &'static [UserRole]) -> Self {
        Self { allowed }
    }
}

/// Middleware that only admits tokens whose role is in the gate.
///
/// Must run after [`require_auth`]; without attached claims it answers 401.
pub async fn require_role(State(gate): State<RoleGate>, request: Request, next: Next) -> Response {
    let Some(claims) = request.extensions().get::<Claims>() else {
        return AuthRejection::MissingToken.into_response();
    };

    if !claims.has_role(gate.allowed) {
        tracing::info!(user_id = %claims.sub, role = %claims.role, "role not permitted");
        return AuthRejection::Forbidden.into_response();
    }

    next.run(request).await
}

/// Extractor for the claims attached by [`require_auth`].
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(claims): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", claims.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Self)
            .ok_or(AuthRejection::MissingToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Email, UserId};
    use axum::{Router, body::Body, http::header::AUTHORIZATION, middleware, routing::get};
    use chrono::Duration;
    use secrecy::SecretString;
    use tower::ServiceExt;

    fn keys() -> TokenKeys {
        TokenKeys::new(
            &SecretString::from("k3y-Material-For-Tests-0123456789!"),
            "shopfloor",
            Duration::hours(1),
        )
    }

    fn token(keys: &TokenKeys, role: UserRole) -> String {
        let email = Email::parse("staff@example.com").unwrap();
        keys.issue(UserId::new(5), &email, role).unwrap().token
    }

    async fn whoami(CurrentUser(claims): CurrentUser) -> String {
        claims.sub
    }

    fn app(keys: &TokenKeys) -> Router {
        Router::new()
            .route("/me", get(whoami))
            .route_layer(middleware::from_fn_with_state(
                RoleGate::new(UserRole::CATALOG_WRITERS),
                require_role,
            ))
            .route_layer(middleware::from_fn_with_state(keys.clone(), require_auth))
    }

    async fn call(app: Router, auth: Option<String>) -> Response {
        let mut builder = axum::http::Request::builder().uri("/me");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let keys = keys();
        let response = call(app(&keys), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let keys = keys();
        let response = call(app(&keys), Some("Bearer nonsense".to_owned())).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_role_is_forbidden() {
        let keys = keys();
        let bearer = format!("Bearer {}", token(&keys, UserRole::Customer));
        let response = call(app(&keys), Some(bearer)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_allowed_role_reaches_handler_with_claims() {
        let keys = keys();
        let bearer = format!("Bearer {}", token(&keys, UserRole::Staff));
        let response = call(app(&keys), Some(bearer)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"5");
    }

    #[tokio::test]
    async fn test_rejection_uses_envelope() {
        let response = AuthRejection::Forbidden.into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Insufficient permissions");
    }
}
