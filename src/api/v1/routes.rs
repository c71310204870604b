/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health と /auth 系
 * - 認証 middleware は app 側で v1 全体に掛ける (anonymous は通す、不正 bearer は 401)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    auth::{login, logout, me, revoke_token, session},
    health::health,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/session", get(session))
        .route("/auth/revoke", post(revoke_token))
}
