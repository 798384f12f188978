use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::profile::{LikeState, LinkType, Post, ProfileLink};
use crate::user::{Identity, NewIdentity, ProfileUpdate};

#[derive(Debug, Default)]
struct Inner {
    identities: HashMap<Uuid, Identity>,
    links: Vec<(Uuid, ProfileLink)>,
    likes: HashSet<(Uuid, Uuid)>,
    posts: Vec<Post>,
    reports: HashSet<(Uuid, Uuid)>,
}

impl Inner {
    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.identities
            .values()
            .any(|identity| identity.username == username && Some(identity.id) != except)
    }

    fn like_state(&self, viewer: Option<Uuid>, target: Uuid) -> LikeState {
        let count = self.likes.iter().filter(|(_, t)| *t == target).count() as i64;
        let liked = viewer.is_some_and(|viewer| self.likes.contains(&(viewer, target)));
        LikeState { liked, count }
    }
}

/// In-memory [`Store`] for development and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_identity(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        Ok(self.lock().identities.get(&id).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<Identity>> {
        Ok(self
            .lock()
            .identities
            .values()
            .find(|identity| identity.email == email)
            .cloned())
    }

    async fn find_identity_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        Ok(self
            .lock()
            .identities
            .values()
            .find(|identity| identity.username == username)
            .cloned())
    }

    async fn create_identity(&self, new: NewIdentity) -> StoreResult<Identity> {
        let mut inner = self.lock();

        if inner.identities.values().any(|i| i.email == new.email) {
            return Err(StoreError::EmailTaken);
        }
        if inner.username_taken(&new.username, None) {
            return Err(StoreError::UsernameTaken);
        }

        let identity = Identity {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            image: None,
            tagline: None,
            verified: false,
            admin: new.admin,
            created_at: Utc::now(),
        };
        inner.identities.insert(identity.id, identity.clone());

        Ok(identity)
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> StoreResult<Identity> {
        let mut inner = self.lock();

        if let Some(username) = &update.username {
            if inner.username_taken(username, Some(id)) {
                return Err(StoreError::UsernameTaken);
            }
        }

        let identity = inner
            .identities
            .get_mut(&id)
            .ok_or(StoreError::NotFound("user"))?;
        if let Some(username) = &update.username {
            identity.username = username.clone();
        }
        identity.tagline = update.stored_tagline(identity.tagline.take());

        Ok(identity.clone())
    }

    async fn set_image(&self, id: Uuid, image: Option<&str>) -> StoreResult<Identity> {
        let mut inner = self.lock();
        let identity = inner
            .identities
            .get_mut(&id)
            .ok_or(StoreError::NotFound("user"))?;
        identity.image = image.map(str::to_string);
        Ok(identity.clone())
    }

    async fn delete_identity(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        if inner.identities.remove(&id).is_none() {
            return Ok(false);
        }

        inner.links.retain(|(owner, _)| *owner != id);
        inner
            .likes
            .retain(|(liker, target)| *liker != id && *target != id);
        let removed_posts: HashSet<Uuid> = inner
            .posts
            .iter()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        inner.posts.retain(|post| post.author_id != id);
        inner
            .reports
            .retain(|(reporter, post)| *reporter != id && !removed_posts.contains(post));

        Ok(true)
    }

    async fn list_links(&self, owner: Uuid) -> StoreResult<Vec<ProfileLink>> {
        Ok(self
            .lock()
            .links
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, link)| link.clone())
            .collect())
    }

    async fn add_link(&self, owner: Uuid, url: &str, kind: LinkType) -> StoreResult<ProfileLink> {
        let mut inner = self.lock();
        if !inner.identities.contains_key(&owner) {
            return Err(StoreError::NotFound("user"));
        }

        let link = ProfileLink {
            id: Uuid::new_v4(),
            url: url.to_string(),
            kind,
        };
        inner.links.push((owner, link.clone()));
        Ok(link)
    }

    async fn delete_link(&self, owner: Uuid, link: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        let before = inner.links.len();
        inner.links.retain(|(o, l)| !(*o == owner && l.id == link));
        Ok(inner.links.len() != before)
    }

    async fn toggle_like(&self, liker: Uuid, target: Uuid) -> StoreResult<LikeState> {
        let mut inner = self.lock();
        if !inner.identities.contains_key(&target) {
            return Err(StoreError::NotFound("user"));
        }

        if !inner.likes.remove(&(liker, target)) {
            inner.likes.insert((liker, target));
        }
        Ok(inner.like_state(Some(liker), target))
    }

    async fn like_state(&self, viewer: Option<Uuid>, target: Uuid) -> StoreResult<LikeState> {
        Ok(self.lock().like_state(viewer, target))
    }

    async fn create_post(
        &self,
        author: Uuid,
        image: &str,
        caption: Option<&str>,
    ) -> StoreResult<Post> {
        let mut inner = self.lock();
        if !inner.identities.contains_key(&author) {
            return Err(StoreError::NotFound("user"));
        }

        let post = Post {
            id: Uuid::new_v4(),
            author_id: author,
            image: image.to_string(),
            caption: caption.map(str::to_string),
            created_at: Utc::now(),
        };
        inner.posts.push(post.clone());
        Ok(post)
    }

    async fn list_posts(&self, author: Uuid) -> StoreResult<Vec<Post>> {
        Ok(self
            .lock()
            .posts
            .iter()
            .rev()
            .filter(|post| post.author_id == author)
            .cloned()
            .collect())
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.lock().posts.iter().find(|post| post.id == id).cloned())
    }

    async fn delete_post(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        let before = inner.posts.len();
        inner.posts.retain(|post| post.id != id);
        inner.reports.retain(|(_, post)| *post != id);
        Ok(inner.posts.len() != before)
    }

    async fn report_post(&self, reporter: Uuid, post: Uuid) -> StoreResult<bool> {
        let mut inner = self.lock();
        if !inner.posts.iter().any(|p| p.id == post) {
            return Err(StoreError::NotFound("post"));
        }
        Ok(inner.reports.insert((reporter, post)))
    }
}
