//! Authenticated-user extractor.
//!
//! Provides an Axum extractor yielding the account behind the bearer token.
//! Routes behind the auth middleware read the identity from request
//! extensions; the extractor also validates directly so handlers keep
//! working when mounted without the middleware.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use domain::models::AccountRole;
use domain::services::Actor;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::user_auth::{create_jwt_config, validate_bearer, AuthenticatedUser};

/// Authenticated account information from the bearer token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// Account ID from the token subject claim.
    pub user_id: Uuid,
    /// Role issued by the identity provider at sign-up.
    pub role: AccountRole,
    /// JWT ID (jti) for session tracking.
    pub jti: String,
}

impl UserAuth {
    /// The domain actor this account acts as.
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

impl From<AuthenticatedUser> for UserAuth {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.user_id,
            role: user.role,
            jti: user.jti,
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Auth middleware may have validated already
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone().into());
        }

        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let jwt = create_jwt_config(&state.config.jwt).map_err(ApiError::Internal)?;

        validate_bearer(&jwt, token).map(Into::into)
    }
}
