use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::Error;
use crate::models::user::{AuthUser, Role};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    fn to_user(&self) -> Option<AuthUser> {
        let id = self.sub.parse::<i64>().ok().filter(|id| *id > 0)?;
        let role = Role::from_claim(self.role.as_deref()?)?;
        Some(AuthUser { id, role })
    }
}

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

/// Resolves the bearer token into an [`AuthUser`] request extension.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let claims = match decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return unauthorized("invalid_token");
        }
    };
    let Some(user) = claims.to_user() else {
        return unauthorized("invalid_claims");
    };

    req.extensions_mut().insert(user);
    next.run(req).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| Error::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: Option<&str>) -> Claims {
        Claims {
            sub: sub.to_string(),
            exp: 0,
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn claims_resolve_to_users() {
        assert_eq!(
            claims("12", Some("student")).to_user(),
            Some(AuthUser { id: 12, role: Role::Student })
        );
        assert_eq!(claims("3", Some("Teacher")).to_user().map(|u| u.role), Some(Role::Instructor));
        assert!(claims("abc", Some("student")).to_user().is_none());
        assert!(claims("0", Some("student")).to_user().is_none());
        assert!(claims("7", None).to_user().is_none());
        assert!(claims("7", Some("janitor")).to_user().is_none());
    }
}
