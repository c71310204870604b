/*
 * Responsibility
 * - /auth 系 handler (login / logout / me / session / revoke)
 * - 認証済みかどうかは middleware が extensions に積んだ SecurityContext で判断
 * - 失敗理由はクライアントに返さない (AppError 側で 401 に正規化)
 */
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;

use crate::{
    api::v1::{
        dto::auth::{
            LoginRequest, LoginResponse, PrincipalResponse, RevokeRequest, SessionResponse,
        },
        extractors::{CurrentUser, Security},
    },
    error::AppError,
    services::auth::{AuthError, BearerCredential, TokenError},
    state::AppState,
};

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload?;
    req.validate()
        .map_err(|msg| AppError::bad_request("INVALID_REQUEST", msg))?;

    let issued = state.login.authenticate(&req.username, &req.password).await?;

    Ok(Json(LoginResponse::from(issued)))
}

/// Revoke the token this request was authenticated with.
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Extension(credential): Extension<BearerCredential>,
) -> Result<StatusCode, AppError> {
    state
        .revocations
        .revoke(&credential.token, credential.expires_at)
        .await
        .map_err(AuthError::from)?;

    info!(user_id = %user.user_id, jti = ?credential.jti, "logged out");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(CurrentUser(user): CurrentUser) -> Json<PrincipalResponse> {
    Json(PrincipalResponse::from(user))
}

pub async fn session(Security(ctx): Security) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: ctx.is_authenticated(),
        principal: ctx.current().cloned().map(PrincipalResponse::from),
    })
}

/// Admin-only: revoke an arbitrary token.
///
/// An already expired token is a no-op; a token that does not verify is a 400.
pub async fn revoke_token(
    State(state): State<AppState>,
    Security(ctx): Security,
    payload: Result<Json<RevokeRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let admin = ctx.require_role("ADMIN")?;
    let Json(req) = payload?;

    let claims = match state.codec.decode(req.token.trim()) {
        Ok(claims) => claims,
        Err(TokenError::Expired) => return Ok(StatusCode::NO_CONTENT),
        Err(_) => return Err(AppError::bad_request("INVALID_TOKEN", "token does not verify")),
    };

    state
        .revocations
        .revoke(req.token.trim(), claims.expires_at())
        .await
        .map_err(AuthError::from)?;

    info!(admin = %admin.user_id, subject = %claims.sub, "token revoked by admin");
    Ok(StatusCode::NO_CONTENT)
}
