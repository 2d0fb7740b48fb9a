//! Authentication middleware
//!
//! Access tokens are issued by the staff portal; this service only verifies
//! them and exposes the signed-in staff member to handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult, ErrorResponse};
use crate::AppState;

/// Staff roles carried in the access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Doctor,
    Nurse,
    Pharmacist,
    FrontDesk,
}

/// Authenticated staff member extracted from the JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub name: String,
    pub role: StaffRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }

    /// Approvals, declines and data fixes are admin-only
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub role: StaffRole,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => return unauthorized_response("Missing or invalid Authorization header"),
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(msg) => return unauthorized_response(&msg),
    };

    let user_id = match claims.sub.parse::<i64>() {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let user = AuthUser {
        user_id,
        name: claims.name,
        role: claims.role,
    };
    tracing::debug!(user_id, name = %user.name, role = ?user.role, "Authenticated request");
    request.extensions_mut().insert(user);

    next.run(request).await
}

/// Decode and validate JWT token
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new("UNAUTHORIZED", message)),
    )
        .into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current staff member
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse::new("UNAUTHORIZED", "Authentication required")),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, role: StaffRole, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "7".to_string(),
            name: "Dr. Reyes".to_string(),
            role,
            exp: now + exp_offset,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn decodes_valid_token() {
        let claims = decode_jwt(&token("s3cret", StaffRole::Admin, 3600), "s3cret").unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, StaffRole::Admin);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_tokens() {
        assert!(decode_jwt(&token("s3cret", StaffRole::Nurse, 3600), "other").is_err());
        assert!(decode_jwt(&token("s3cret", StaffRole::Nurse, -3600), "s3cret").is_err());
    }

    #[test]
    fn only_admins_pass_admin_guard() {
        let admin = AuthUser { user_id: 1, name: "A".into(), role: StaffRole::Admin };
        let nurse = AuthUser { user_id: 2, name: "N".into(), role: StaffRole::Nurse };
        assert!(admin.require_admin().is_ok());
        assert!(matches!(nurse.require_admin(), Err(AppError::InsufficientPermissions)));
    }
}
