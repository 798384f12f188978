use axum::extract::State;

use super::ValidJson;
use crate::auth::{
    authenticate, create_account, end_session, issue_session, AuthUser, OptionalUser,
};
use crate::cookies::CookieJar;
use crate::errors::{ApiResult, Rpc};
use crate::session::Session;
use crate::state::AppState;
use crate::validation::{LoginRequest, RegisterRequest};

pub async fn register(
    State(state): State<AppState>,
    cookies: CookieJar,
    ValidJson(request): ValidJson<RegisterRequest>,
) -> ApiResult<Session> {
    let identity = create_account(&state, &request).await?;
    issue_session(&state, &cookies, Session::from(&identity)).map(Rpc)
}

pub async fn login(
    State(state): State<AppState>,
    cookies: CookieJar,
    ValidJson(credentials): ValidJson<LoginRequest>,
) -> ApiResult<Session> {
    let identity = authenticate(
        state.store.as_ref(),
        state.passwords.as_ref(),
        &credentials,
    )
    .await?;

    issue_session(&state, &cookies, identity.into()).map(Rpc)
}

pub async fn logout(cookies: CookieJar) -> ApiResult<()> {
    end_session(&cookies);
    Ok(Rpc(()))
}

pub async fn session(user: OptionalUser) -> ApiResult<Option<Session>> {
    Ok(Rpc(user.identity.as_ref().map(Session::from)))
}

/// Re-derive the session from the identity record and re-issue the token
pub async fn refresh_session(State(state): State<AppState>, user: AuthUser) -> ApiResult<Session> {
    issue_session(&state, &user.cookies, Session::from(&user.identity)).map(Rpc)
}
