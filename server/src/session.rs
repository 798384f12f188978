use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use color_eyre::eyre::WrapErr;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::{Identity, MeView, PublicIdentity};

/// Cookie name for storing the session token
pub const SESSION_COOKIE_NAME: &str = "fitcheck_session";

/// Default session duration in days
pub const DEFAULT_SESSION_DURATION_DAYS: i64 = 30;

/// Tokens older than this are re-issued on the next authenticated request
pub const SESSION_REFRESH_AFTER_HOURS: i64 = 24;

/// The identity fields embedded in a signed session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub username: String,
    pub image: Option<String>,
}

impl From<PublicIdentity> for Session {
    fn from(identity: PublicIdentity) -> Self {
        Session {
            user_id: identity.id,
            username: identity.username,
            image: identity.image,
        }
    }
}

impl From<&Identity> for Session {
    fn from(identity: &Identity) -> Self {
        identity.to_public().into()
    }
}

impl From<&MeView> for Session {
    fn from(me: &MeView) -> Self {
        Session {
            user_id: me.id,
            username: me.username.clone(),
            image: me.image.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    username: String,
    image: Option<String>,
    iat: i64,
    exp: i64,
}

/// A session recovered from a token whose signature and expiry checked out
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub session: Session,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerifiedSession {
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at >= Duration::hours(SESSION_REFRESH_AFTER_HOURS)
    }
}

/// HS256 keys for signing and verifying session tokens
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeys")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::days(DEFAULT_SESSION_DURATION_DAYS),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn issue(&self, session: &Session, now: DateTime<Utc>) -> color_eyre::Result<String> {
        let claims = SessionClaims {
            sub: session.user_id,
            username: session.username.clone(),
            image: session.image.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .wrap_err("Failed to sign session token")
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedSession, jsonwebtoken::errors::Error> {
        let validation = Validation::new(Algorithm::HS256);
        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)?;
        let claims = data.claims;

        Ok(VerifiedSession {
            session: Session {
                user_id: claims.sub,
                username: claims.username,
                image: claims.image,
            },
            issued_at: timestamp(claims.iat),
            expires_at: timestamp(claims.exp),
        })
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}
