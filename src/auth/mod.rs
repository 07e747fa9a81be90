//! Request identity and per-operation capability checks.
//!
//! Handlers ask for the capability they need ([`AuthUser`], [`RequireRider`],
//! [`RequireAdmin`]) instead of branching on a role flag.

pub mod roles;
pub mod token;

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::roles::check_admin;
use crate::error::AppError;
use crate::models::rider::Rider;
use crate::state::AppState;

/// Caller identity taken from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthorized("expected Authorization: Bearer <token>".to_string())
        })?;

        let claims = token::validate_token(token, &state.config.jwt_secret)
            .map_err(|_| AppError::Unauthorized("invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

/// Caller with a linked rider profile.
#[derive(Debug, Clone)]
pub struct RequireRider {
    pub user: AuthUser,
    pub rider: Rider,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireRider {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let rider = state
            .riders
            .find_by_user(&user.user_id)
            .ok_or_else(|| AppError::Forbidden("rider profile required".to_string()))?;

        Ok(RequireRider { user, rider })
    }
}

/// Caller passing the admin predicate within the configured timeout.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let (is_admin, _) = check_admin(
            state.admins.as_ref(),
            user.user_id,
            state.config.admin_check_timeout,
        )
        .await;

        if !is_admin {
            return Err(AppError::Forbidden("admin role required".to_string()));
        }

        Ok(RequireAdmin(user))
    }
}
