use axum::extract::{Path, State};
use uuid::Uuid;

use crate::auth::{AuthUser, OptionalUser};
use crate::errors::{ApiError, ApiResult, Rpc};
use crate::profile::{LikeState, ProfileView};
use crate::state::AppState;
use crate::store::load_profile_view;

pub async fn get_profile(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Path(username): Path<String>,
) -> ApiResult<ProfileView> {
    let viewer_id = viewer.identity.as_ref().map(|identity| identity.id);

    load_profile_view(state.store.as_ref(), viewer_id, &username)
        .await?
        .map(Rpc)
        .ok_or(ApiError::NotFound("profile"))
}

/// Toggle the caller's like of another profile
pub async fn like_profile(
    State(state): State<AppState>,
    user: AuthUser,
    Path(target): Path<Uuid>,
) -> ApiResult<LikeState> {
    if target == user.identity.id {
        return Err(ApiError::Forbidden);
    }
    if state.store.find_identity(target).await?.is_none() {
        return Err(ApiError::NotFound("profile"));
    }

    Ok(Rpc(state.store.toggle_like(user.identity.id, target).await?))
}
