use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::UploadTarget;

/// Platform a profile link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Twitter,
    Youtube,
    Tiktok,
    Discord,
    Instagram,
    Github,
    Website,
    Other,
}

const KNOWN_HOSTS: &[(&str, LinkType)] = &[
    ("twitter.com", LinkType::Twitter),
    ("x.com", LinkType::Twitter),
    ("youtube.com", LinkType::Youtube),
    ("youtu.be", LinkType::Youtube),
    ("tiktok.com", LinkType::Tiktok),
    ("discord.com", LinkType::Discord),
    ("discord.gg", LinkType::Discord),
    ("instagram.com", LinkType::Instagram),
    ("github.com", LinkType::Github),
];

impl LinkType {
    /// Classify a link by its host
    pub fn from_url(url: &Url) -> Self {
        let Some(host) = url.host_str() else {
            return LinkType::Other;
        };
        let host = host.to_ascii_lowercase();

        for (domain, kind) in KNOWN_HOSTS {
            if host == *domain || host.ends_with(&format!(".{domain}")) {
                return *kind;
            }
        }

        match url.scheme() {
            "http" | "https" => LinkType::Website,
            _ => LinkType::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Twitter => "twitter",
            LinkType::Youtube => "youtube",
            LinkType::Tiktok => "tiktok",
            LinkType::Discord => "discord",
            LinkType::Instagram => "instagram",
            LinkType::Github => "github",
            LinkType::Website => "website",
            LinkType::Other => "other",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkType {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "twitter" => LinkType::Twitter,
            "youtube" => LinkType::Youtube,
            "tiktok" => LinkType::Tiktok,
            "discord" => LinkType::Discord,
            "instagram" => LinkType::Instagram,
            "github" => LinkType::Github,
            "website" => LinkType::Website,
            "other" => LinkType::Other,
            other => return Err(color_eyre::eyre::eyre!("unknown link type: {other}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLink {
    pub id: Uuid,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: LinkType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub count: i64,
}

impl LikeState {
    /// The state after flipping the viewer's like
    pub fn toggled(self) -> Self {
        if self.liked {
            LikeState {
                liked: false,
                count: (self.count - 1).max(0),
            }
        } else {
            LikeState {
                liked: true,
                count: self.count + 1,
            }
        }
    }
}

/// An outfit post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub image: String,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A freshly created post together with the target its image must be uploaded to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPost {
    pub post: Post,
    pub upload: UploadTarget,
}

/// Public view of a profile, as seen by the requesting viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub username: String,
    pub tagline: Option<String>,
    pub image: Option<String>,
    pub links: Vec<ProfileLink>,
    pub likes: LikeState,
    pub posts: Vec<Post>,
    pub is_owner: bool,
}
