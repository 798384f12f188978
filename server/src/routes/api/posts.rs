use axum::extract::{Path, State};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::ValidJson;
use crate::auth::AuthUser;
use crate::errors::{ApiError, ApiResult, Rpc};
use crate::profile::CreatedPost;
use crate::state::AppState;
use crate::storage::UploadSigner;
use crate::validation::CreatePostRequest;

/// Create an outfit post; the image is uploaded afterwards to the returned target
pub async fn create_post(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<CreatePostRequest>,
) -> ApiResult<CreatedPost> {
    let key = UploadSigner::post_key(user.identity.id);
    let upload = state.uploads.presign(&key, Utc::now())?;
    let caption = request
        .caption
        .as_deref()
        .map(str::trim)
        .filter(|caption| !caption.is_empty());

    let post = state
        .store
        .create_post(user.identity.id, &upload.public_url, caption)
        .await?;
    info!(user_id = %user.identity.id, post_id = %post.id, "Created post");

    Ok(Rpc(CreatedPost { post, upload }))
}

pub async fn delete_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<()> {
    let post = state
        .store
        .find_post(post_id)
        .await?
        .ok_or(ApiError::NotFound("post"))?;

    if post.author_id != user.identity.id {
        return Err(ApiError::Forbidden);
    }

    state.store.delete_post(post_id).await?;
    info!(user_id = %user.identity.id, %post_id, "Deleted post");
    Ok(Rpc(()))
}

pub async fn report_post(
    State(state): State<AppState>,
    user: AuthUser,
    Path(post_id): Path<Uuid>,
) -> ApiResult<()> {
    if state.store.report_post(user.identity.id, post_id).await? {
        info!(reporter = %user.identity.id, %post_id, "Post reported");
    } else {
        info!(reporter = %user.identity.id, %post_id, "Repeated report ignored");
    }
    Ok(Rpc(()))
}
