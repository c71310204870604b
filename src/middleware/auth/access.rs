//! bearer token 検証 → SecurityContext を extensions に入れる
//!
//! - Authorization が無い / Bearer 以外: anonymous のまま通す (認可は extractor 側)
//! - Bearer が付いていて検証に失敗: handler に届かせず 401
//! - 成功: principal を bind した SecurityContext と BearerCredential を extensions に格納

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{AuthOutcome, SecurityContext};
use crate::state::AppState;

/// `/api/v1/*` に認証を掛けるための middleware を適用する。
///
/// 例：
/// ```ignore
/// let v1 = api::v1::routes();
/// let v1 = middleware::auth::access::apply(v1, state.clone());
/// app = app.nest("/api/v1", v1);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // 既に bind 済みなら再検証しない
    if req
        .extensions()
        .get::<SecurityContext>()
        .is_some_and(SecurityContext::is_authenticated)
    {
        return Ok(next.run(req).await);
    }

    let mut ctx = SecurityContext::anonymous();

    match state.gate.authenticate(req.headers()).await {
        AuthOutcome::Anonymous => {}
        AuthOutcome::Bound(authenticated) => {
            ctx.bind(authenticated.principal).map_err(|err| {
                tracing::error!(error = %err, "fresh security context refused binding");
                AppError::Internal
            })?;
            req.extensions_mut().insert(authenticated.credential);
        }
        AuthOutcome::Rejected => return Err(AppError::Unauthorized),
    }

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
