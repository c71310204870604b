use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::context::{Principal, SecurityContext};

/// The request's security context, anonymous or bound.
///
/// The access middleware always inserts one. Its absence means the middleware is not
/// applied to this route, which is treated as unauthenticated.
pub struct Security(pub SecurityContext);

/// The bound principal. Anonymous requests get 401.
pub struct CurrentUser(pub Principal);

impl<S> FromRequestParts<S> for Security
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .cloned()
            .map(Security)
            .ok_or(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .and_then(SecurityContext::current)
            .cloned()
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}
