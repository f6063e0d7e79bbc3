use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use db::models::user::User;
use tracing::warn;

use crate::AppState;

/// Identity of the authenticated caller, injected into request extensions
/// by [`require_session`].
#[derive(Clone)]
pub struct RequestContext {
    pub user: User,
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let bearer = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(token)) => token.token().to_owned(),
        None => return StatusCode::UNAUTHORIZED.into_response(),
    };

    let identity = match state.jwt().validate(&bearer) {
        Ok(identity) => identity,
        Err(error) => {
            warn!(?error, "failed to validate access token");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let user = match User::find_by_id(&state.db().pool, identity.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("user `{}` missing", identity.user_id);
            return StatusCode::UNAUTHORIZED.into_response();
        }
        Err(error) => {
            warn!(?error, "failed to load user");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    req.extensions_mut().insert(RequestContext { user });

    next.run(req).await
}
