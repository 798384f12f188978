use axum::extract::{Path, State};
use tracing::info;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::errors::{ApiError, ApiResult, Rpc};
use crate::state::AppState;

pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<()> {
    if !state.store.delete_identity(user_id).await? {
        return Err(ApiError::NotFound("user"));
    }
    info!(admin = %admin.identity.id, %user_id, "Admin deleted user");
    Ok(Rpc(()))
}

pub async fn delete_post(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<()> {
    if !state.store.delete_post(post_id).await? {
        return Err(ApiError::NotFound("post"));
    }
    info!(admin = %admin.identity.id, %post_id, "Admin deleted post");
    Ok(Rpc(()))
}
