//! API handlers for LMS REST endpoints

pub mod authors;
pub mod books;
pub mod health;
pub mod loans;
pub mod notifications;
pub mod openapi;
pub mod tickets;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use crate::{
    error::AppError,
    models::user::{TokenUse, UserClaims},
    AppState,
};

/// Extractor for authenticated user from JWT access token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Get the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        // Refresh tokens are only accepted by the refresh endpoint
        if claims.token_use != TokenUse::Access {
            return Err(AppError::Authentication("Access token required".to_string()));
        }

        Ok(AuthenticatedUser(claims))
    }
}
