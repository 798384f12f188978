use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::profile::ProfileLink;

/// The durable user record backing authentication and profile display
#[derive(Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// PHC-format hash. `None` for identities provisioned without credentials.
    pub password_hash: Option<String>,
    /// Public URL of the avatar object
    pub image: Option<String>,
    pub tagline: Option<String>,
    pub verified: bool,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field(
                "password_hash",
                &self.password_hash.as_ref().map(|_| "<redacted>"),
            )
            .field("image", &self.image)
            .field("tagline", &self.tagline)
            .field("verified", &self.verified)
            .field("admin", &self.admin)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Identity {
    pub fn to_public(&self) -> PublicIdentity {
        PublicIdentity {
            id: self.id,
            username: self.username.clone(),
            image: self.image.clone(),
        }
    }

    pub fn to_me(&self, links: Vec<ProfileLink>) -> MeView {
        MeView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            tagline: self.tagline.clone(),
            image: self.image.clone(),
            verified: self.verified,
            admin: self.admin,
            links,
        }
    }
}

/// Minimal identity projection handed out by the authentication boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub id: Uuid,
    pub username: String,
    pub image: Option<String>,
}

/// Everything the signed-in user may see about themselves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub tagline: Option<String>,
    pub image: Option<String>,
    pub verified: bool,
    pub admin: bool,
    pub links: Vec<ProfileLink>,
}

/// Fields for a new identity. Email must already be normalised.
#[derive(Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub admin: bool,
}

impl fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewIdentity")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

/// A partial profile edit. An empty tagline clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub tagline: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.tagline.is_none()
    }

    /// The tagline value to store, with `""` meaning "clear"
    pub(crate) fn stored_tagline(&self, current: Option<String>) -> Option<String> {
        match self.tagline.as_deref() {
            None => current,
            Some("") => None,
            Some(tagline) => Some(tagline.to_string()),
        }
    }
}

/// Normalise an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Canonical page path for a profile
pub fn profile_path(username: &str) -> String {
    format!("/u/{}", urlencoding::encode(username))
}
