//! Bearer-token authentication middleware.
//!
//! Validates the identity-provider JWT on protected routes and stores the
//! authenticated account in request extensions for extractors and the rate
//! limiter.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use domain::models::AccountRole;
use shared::jwt::{extract_user_id, JwtConfig};

use crate::app::AppState;
use crate::config::JwtAuthConfig;
use crate::error::ApiError;

/// Authenticated account stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: AccountRole,
    pub jti: String,
}

/// Build the token verifier from configuration.
pub fn create_jwt_config(config: &JwtAuthConfig) -> Result<JwtConfig, String> {
    JwtConfig::from_rsa_pem(&config.public_key, config.leeway_secs)
        .map_err(|e| format!("Invalid JWT configuration: {}", e))
}

/// Validate a bearer token and produce the authenticated account.
pub fn validate_bearer(jwt: &JwtConfig, token: &str) -> Result<AuthenticatedUser, ApiError> {
    let claims = jwt
        .validate_token(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    let user_id = extract_user_id(&claims)
        .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))?;

    let role: AccountRole = claims
        .role
        .parse()
        .map_err(|_| ApiError::Unauthorized("Invalid token role".to_string()))?;

    Ok(AuthenticatedUser {
        user_id,
        role,
        jti: claims.jti,
    })
}

/// Middleware requiring a valid bearer token on the request.
pub async fn require_user_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let token = match bearer_token(&req) {
        Some(token) => token,
        None => {
            return ApiError::Unauthorized("Missing Authorization header".to_string())
                .into_response()
        }
    };

    let jwt = match create_jwt_config(&state.config.jwt) {
        Ok(jwt) => jwt,
        Err(e) => return ApiError::Internal(e).into_response(),
    };

    match validate_bearer(&jwt, &token) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

fn bearer_token(req: &Request<Body>) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|t| t.to_string())
}
