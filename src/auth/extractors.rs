use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::error::AppError;

/// Identity taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

impl AuthUser {
    /// Check that the `:id` a route acts on belongs to the caller.
    ///
    /// With `enforce == false` any authenticated identity may act on any
    /// `:id`; the mismatch is only logged.
    pub fn ensure_owner(&self, id: Uuid, enforce: bool) -> Result<(), AppError> {
        if self.id == id {
            return Ok(());
        }
        if enforce {
            warn!(caller = %self.id, target = %id, "ownership check failed");
            return Err(AppError::Forbidden);
        }
        warn!(caller = %self.id, target = %id, "acting on another user's resource");
        Ok(())
    }
}

/// Read `Authorization: Bearer <token>` and verify it.
pub fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<AuthUser, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidToken("Missing Authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(AppError::InvalidToken("Invalid Authorization header"))?;

    let claims = keys.verify(token.trim()).map_err(|e| {
        warn!(error = %e, "invalid or expired token");
        AppError::InvalidToken("Invalid or expired token")
    })?;

    Ok(AuthUser {
        id: claims.id,
        email: claims.email,
    })
}

/// Middleware stage for protected routes. Rejects with 401 before the
/// handler runs; on success the identity is stored in request extensions.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = authenticate(request.headers(), &keys)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthUser>().cloned().ok_or_else(|| {
            warn!("AuthUser missing from request extensions; route not behind require_auth");
            AppError::InvalidToken("Missing Authorization header")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{claims::Claims, jwt::test_keys};
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use time::OffsetDateTime;
    use tower::ServiceExt;

    async fn whoami(user: AuthUser) -> String {
        user.email
    }

    fn app(keys: JwtKeys) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(from_fn_with_state(keys.clone(), require_auth))
            .with_state(keys)
    }

    async fn call(keys: JwtKeys, auth: Option<&str>) -> (StatusCode, String) {
        let mut req = HttpRequest::builder().uri("/whoami");
        if let Some(value) = auth {
            req = req.header(AUTHORIZATION, value);
        }
        let res = app(keys)
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_reaches_handler() {
        let keys = test_keys("s", "iss", "aud");
        let token = keys.sign(Uuid::new_v4(), "a@x.com").unwrap();
        let (status, body) = call(keys, Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "a@x.com");
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let (status, body) = call(test_keys("s", "iss", "aud"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Missing Authorization header"));
    }

    #[tokio::test]
    async fn wrong_scheme_is_rejected() {
        let keys = test_keys("s", "iss", "aud");
        let token = keys.sign(Uuid::new_v4(), "a@x.com").unwrap();
        let (status, _) = call(keys, Some(&format!("Basic {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn foreign_signature_is_rejected() {
        let other = test_keys("other", "iss", "aud");
        let token = other.sign(Uuid::new_v4(), "a@x.com").unwrap();
        let (status, body) = call(test_keys("s", "iss", "aud"), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("Invalid or expired token"));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let keys = test_keys("s", "iss", "aud");
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let token = keys
            .sign_raw(&Claims {
                id: Uuid::new_v4(),
                email: "a@x.com".into(),
                iat: (now - 7200) as usize,
                exp: (now - 3600) as usize,
                iss: "iss".into(),
                aud: "aud".into(),
            })
            .unwrap();
        let (status, _) = call(keys, Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn ownership_check_respects_flag() {
        let me = AuthUser {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
        };
        let other = Uuid::new_v4();
        assert!(me.ensure_owner(me.id, true).is_ok());
        assert!(matches!(me.ensure_owner(other, true), Err(AppError::Forbidden)));
        assert!(me.ensure_owner(other, false).is_ok());
    }
}
