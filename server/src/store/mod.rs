//! Persistence for identities, links, likes and posts.
//!
//! [`Store`] is the seam between the HTTP layer and storage. [`PgStore`] backs
//! production; [`MemoryStore`] backs local development and tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::{setup_db_pool, PgStore};

use async_trait::async_trait;
use uuid::Uuid;

use crate::profile::{LikeState, LinkType, Post, ProfileLink, ProfileView};
use crate::user::{Identity, NewIdentity, ProfileUpdate};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("username is already taken")]
    UsernameTaken,
    #[error("email is already registered")]
    EmailTaken,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>>;

    /// Exact match on an already-normalised email
    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>>;

    async fn find_identity_by_username(&self, username: &str) -> StoreResult<Option<Identity>>;

    async fn create_identity(&self, new: NewIdentity) -> StoreResult<Identity>;

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> StoreResult<Identity>;

    async fn set_image(&self, id: Uuid, image: Option<&str>) -> StoreResult<Identity>;

    /// Removes the identity together with its links, likes and posts
    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool>;

    /// Links in creation order
    async fn list_links(&self, owner: Uuid) -> StoreResult<Vec<ProfileLink>>;

    async fn add_link(&self, owner: Uuid, url: &str, kind: LinkType) -> StoreResult<ProfileLink>;

    async fn delete_link(&self, owner: Uuid, link: Uuid) -> StoreResult<bool>;

    /// Flip `liker`'s like of `target` and return the resulting state
    async fn toggle_like(&self, liker: Uuid, target: Uuid) -> StoreResult<LikeState>;

    async fn like_state(&self, viewer: Option<Uuid>, target: Uuid) -> StoreResult<LikeState>;

    async fn create_post(
        &self,
        author: Uuid,
        image: &str,
        caption: Option<&str>,
    ) -> StoreResult<Post>;

    /// Newest first
    async fn list_posts(&self, author: Uuid) -> StoreResult<Vec<Post>>;

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>>;

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool>;

    /// Returns `false` if this reporter already reported the post
    async fn report_post(&self, reporter: Uuid, post: Uuid) -> StoreResult<bool>;
}

/// Assemble the public profile for `username` as seen by `viewer`
pub async fn load_profile_view(
    store: &dyn Store,
    viewer: Option<Uuid>,
    username: &str,
) -> StoreResult<Option<ProfileView>> {
    let Some(identity) = store.find_identity_by_username(username).await? else {
        return Ok(None);
    };

    Ok(Some(ProfileView {
        id: identity.id,
        links: store.list_links(identity.id).await?,
        likes: store.like_state(viewer, identity.id).await?,
        posts: store.list_posts(identity.id).await?,
        is_owner: viewer == Some(identity.id),
        username: identity.username,
        tagline: identity.tagline,
        image: identity.image,
    }))
}
