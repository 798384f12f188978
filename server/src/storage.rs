//! Presigned upload targets for the object store.
//!
//! The server never sees image bytes: it hands the client a time-limited `PUT`
//! URL whose query string carries an HMAC-SHA256 signature over the method,
//! object key and expiry. The object store verifies the signature with the
//! same [`UploadSigner`] before accepting the body.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How long an upload target stays valid
pub const UPLOAD_TTL_MINUTES: i64 = 10;

/// Where and until when a client may `PUT` one object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTarget {
    pub url: String,
    pub key: String,
    pub public_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("upload target expired")]
    Expired,
    #[error("upload signature mismatch")]
    BadSignature,
}

/// Query parameters of a presigned upload URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadParams {
    pub expires: i64,
    pub signature: String,
}

#[derive(Clone)]
pub struct UploadSigner {
    key: hmac::Key,
    upload_base: String,
    public_base: String,
    ttl: Duration,
}

impl fmt::Debug for UploadSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSigner")
            .field("upload_base", &self.upload_base)
            .field("public_base", &self.public_base)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl UploadSigner {
    pub fn new(secret: &[u8], upload_base: &str, public_base: &str) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, secret),
            upload_base: upload_base.trim_end_matches('/').to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
            ttl: Duration::minutes(UPLOAD_TTL_MINUTES),
        }
    }

    /// Object key for a new avatar of `user_id`
    pub fn avatar_key(user_id: Uuid) -> String {
        format!("avatars/{user_id}/{}", Uuid::new_v4())
    }

    /// Whether `key` has the shape [`avatar_key`](Self::avatar_key) gives out for `user_id`
    pub fn is_avatar_key_of(user_id: Uuid, key: &str) -> bool {
        let Some((owner, object)) = key
            .strip_prefix("avatars/")
            .and_then(|rest| rest.split_once('/'))
        else {
            return false;
        };
        owner == user_id.to_string() && Uuid::parse_str(object).is_ok()
    }

    /// Object key for a new outfit post image of `user_id`
    pub fn post_key(user_id: Uuid) -> String {
        format!("posts/{user_id}/{}", Uuid::new_v4())
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{key}", self.public_base)
    }

    pub fn presign(&self, key: &str, now: DateTime<Utc>) -> color_eyre::Result<UploadTarget> {
        let expires_at = now + self.ttl;
        let params = UploadParams {
            expires: expires_at.timestamp(),
            signature: self.signature(key, expires_at.timestamp()),
        };
        let query = serde_urlencoded::to_string(&params)?;

        Ok(UploadTarget {
            url: format!("{}/uploads/{key}?{query}", self.upload_base),
            key: key.to_string(),
            public_url: self.public_url(key),
            expires_at: Utc
                .timestamp_opt(params.expires, 0)
                .single()
                .unwrap_or(expires_at),
        })
    }

    /// Check a presigned upload. The signature comparison is constant-time.
    pub fn verify(
        &self,
        key: &str,
        params: &UploadParams,
        now: DateTime<Utc>,
    ) -> Result<(), UploadRejection> {
        let signature = URL_SAFE_NO_PAD
            .decode(&params.signature)
            .map_err(|_| UploadRejection::BadSignature)?;
        hmac::verify(
            &self.key,
            signing_input(key, params.expires).as_bytes(),
            &signature,
        )
        .map_err(|_| UploadRejection::BadSignature)?;

        if now.timestamp() > params.expires {
            return Err(UploadRejection::Expired);
        }
        Ok(())
    }

    fn signature(&self, key: &str, expires: i64) -> String {
        let tag = hmac::sign(&self.key, signing_input(key, expires).as_bytes());
        URL_SAFE_NO_PAD.encode(tag.as_ref())
    }
}

fn signing_input(key: &str, expires: i64) -> String {
    format!("PUT\n{key}\n{expires}")
}
