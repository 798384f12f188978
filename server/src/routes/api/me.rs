use axum::extract::{Path, State};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::ValidJson;
use crate::auth::{end_session, AuthUser};
use crate::errors::{ApiError, ApiResult, Rpc};
use crate::profile::{LinkType, ProfileLink};
use crate::state::AppState;
use crate::storage::{UploadSigner, UploadTarget};
use crate::user::{MeView, ProfileUpdate};
use crate::validation::{
    parse_link_url, AddLinkRequest, ConfirmImageRequest, EditProfileRequest,
};

pub async fn get_me(State(state): State<AppState>, user: AuthUser) -> ApiResult<MeView> {
    let links = state.store.list_links(user.identity.id).await?;
    Ok(Rpc(user.identity.to_me(links)))
}

pub async fn edit_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<EditProfileRequest>,
) -> ApiResult<MeView> {
    let update = ProfileUpdate {
        username: request.username.map(|u| u.trim().to_string()),
        tagline: request.tagline.map(|t| t.trim().to_string()),
    };

    let identity = state.store.update_profile(user.identity.id, &update).await?;
    info!(user_id = %identity.id, "Updated profile");

    let links = state.store.list_links(identity.id).await?;
    Ok(Rpc(identity.to_me(links)))
}

pub async fn delete_profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<()> {
    if !state.store.delete_identity(user.identity.id).await? {
        return Err(ApiError::NotFound("user"));
    }
    end_session(&user.cookies);
    info!(user_id = %user.identity.id, "Deleted account");
    Ok(Rpc(()))
}

/// Hand out an upload target for a new avatar. The identity keeps its current
/// image until the upload is confirmed.
pub async fn set_image(State(state): State<AppState>, user: AuthUser) -> ApiResult<UploadTarget> {
    let key = UploadSigner::avatar_key(user.identity.id);
    let target = state.uploads.presign(&key, Utc::now())?;
    info!(user_id = %user.identity.id, key = %target.key, "Issued avatar upload target");

    Ok(Rpc(target))
}

/// Point the identity at an uploaded avatar
pub async fn confirm_image(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<ConfirmImageRequest>,
) -> ApiResult<MeView> {
    if !UploadSigner::is_avatar_key_of(user.identity.id, &request.key) {
        warn!(user_id = %user.identity.id, key = %request.key, "Refused foreign avatar key");
        return Err(ApiError::Forbidden);
    }

    let public_url = state.uploads.public_url(&request.key);
    let identity = state
        .store
        .set_image(user.identity.id, Some(&public_url))
        .await?;
    info!(user_id = %identity.id, key = %request.key, "Avatar updated");

    let links = state.store.list_links(identity.id).await?;
    Ok(Rpc(identity.to_me(links)))
}

pub async fn delete_image(State(state): State<AppState>, user: AuthUser) -> ApiResult<MeView> {
    let identity = state.store.set_image(user.identity.id, None).await?;
    let links = state.store.list_links(identity.id).await?;
    Ok(Rpc(identity.to_me(links)))
}

pub async fn add_link(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(request): ValidJson<AddLinkRequest>,
) -> ApiResult<ProfileLink> {
    let url = parse_link_url(&request.url)?;
    let kind = LinkType::from_url(&url);

    let link = state
        .store
        .add_link(user.identity.id, url.as_str(), kind)
        .await?;
    info!(user_id = %user.identity.id, link_id = %link.id, %kind, "Added link");

    Ok(Rpc(link))
}

pub async fn delete_link(
    State(state): State<AppState>,
    user: AuthUser,
    Path(link_id): Path<Uuid>,
) -> ApiResult<()> {
    if !state.store.delete_link(user.identity.id, link_id).await? {
        return Err(ApiError::NotFound("link"));
    }
    Ok(Rpc(()))
}
