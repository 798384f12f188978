use std::env;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use color_eyre::eyre::{eyre, WrapErr};
use rand::RngCore;
use tracing::{info, warn};

use crate::password::{Argon2Scheme, PasswordScheme};
use crate::session::SessionKeys;
use crate::storage::UploadSigner;
use crate::store::{setup_db_pool, MemoryStore, PgStore, Store};

/// Where upload targets point and how they are signed
#[derive(Clone)]
pub struct StorageConfig {
    pub upload_url: String,
    pub public_url: String,
    pub signing_key: Vec<u8>,
}

#[derive(Clone)]
pub struct AppConfig {
    pub domain: String,
    pub protocol: String,
    pub port: u16,
    pub session_secret: Vec<u8>,
    pub database_url: Option<String>,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> color_eyre::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok();

        let session_secret = secret_from_env("SESSION_SECRET")?.unwrap_or_else(|| {
            warn!("SESSION_SECRET not set, generating one; sessions will not survive a restart");
            random_secret()
        });

        let signing_key = match secret_from_env("STORAGE_SIGNING_KEY")? {
            Some(key) => key,
            None if database_url.is_none() => {
                warn!("STORAGE_SIGNING_KEY not set, generating one for the in-memory dev setup");
                random_secret()
            }
            None => return Err(eyre!("STORAGE_SIGNING_KEY environment variable not set")),
        };

        let upload_url =
            env::var("STORAGE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());
        let public_url =
            env::var("STORAGE_PUBLIC_URL").unwrap_or_else(|_| format!("{upload_url}/objects"));

        let port = match env::var("PORT") {
            Ok(port) => port.parse().wrap_err("PORT must be a number")?,
            Err(_) => 3000,
        };

        Ok(Self {
            domain: env::var("DOMAIN").unwrap_or_else(|_| "localhost:3000".to_string()),
            protocol: env::var("PROTO").unwrap_or_else(|_| "https".to_string()),
            port,
            session_secret,
            database_url,
            storage: StorageConfig {
                upload_url,
                public_url,
                signing_key,
            },
        })
    }
}

/// Secrets are given base64-encoded; anything that doesn't decode is used verbatim
pub fn decode_secret(value: &str) -> Vec<u8> {
    STANDARD
        .decode(value)
        .unwrap_or_else(|_| value.as_bytes().to_vec())
}

fn secret_from_env(name: &str) -> color_eyre::Result<Option<Vec<u8>>> {
    match env::var(name) {
        Ok(value) if value.is_empty() => Err(eyre!("{name} is set but empty")),
        Ok(value) => Ok(Some(decode_secret(&value))),
        Err(_) => Ok(None),
    }
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub passwords: Arc<dyn PasswordScheme>,
    pub sessions: SessionKeys,
    pub uploads: UploadSigner,
    pub domain: String,
    pub protocol: String,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        Self {
            store,
            passwords: Arc::new(Argon2Scheme),
            sessions: SessionKeys::new(&config.session_secret),
            uploads: UploadSigner::new(
                &config.storage.signing_key,
                &config.storage.upload_url,
                &config.storage.public_url,
            ),
            domain: config.domain.clone(),
            protocol: config.protocol.clone(),
        }
    }

    pub async fn from_config(config: &AppConfig) -> color_eyre::Result<Self> {
        let store: Arc<dyn Store> = match &config.database_url {
            Some(url) => Arc::new(PgStore::new(setup_db_pool(url).await?)),
            None => {
                warn!("DATABASE_URL not set, using the in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        info!(domain = %config.domain, storage = %config.storage.upload_url, "App state ready");
        Ok(Self::new(store, config))
    }

    /// Cookies are only marked `Secure` when served over https
    pub fn secure_cookies(&self) -> bool {
        self.protocol == "https"
    }

    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_secrets_are_decoded() {
        env::set_var("FITCHECK_TEST_SECRET_B64", STANDARD.encode(b"sekrit"));
        assert_eq!(
            secret_from_env("FITCHECK_TEST_SECRET_B64").unwrap(),
            Some(b"sekrit".to_vec())
        );
        env::remove_var("FITCHECK_TEST_SECRET_B64");
    }

    #[test]
    fn raw_secrets_are_used_verbatim() {
        env::set_var("FITCHECK_TEST_SECRET_RAW", "not base64!");
        assert_eq!(
            secret_from_env("FITCHECK_TEST_SECRET_RAW").unwrap(),
            Some(b"not base64!".to_vec())
        );
        env::remove_var("FITCHECK_TEST_SECRET_RAW");
    }

    #[test]
    fn missing_secret_is_none_and_empty_is_an_error() {
        env::remove_var("FITCHECK_TEST_SECRET_MISSING");
        assert_eq!(secret_from_env("FITCHECK_TEST_SECRET_MISSING").unwrap(), None);

        env::set_var("FITCHECK_TEST_SECRET_EMPTY", "");
        assert!(secret_from_env("FITCHECK_TEST_SECRET_EMPTY").is_err());
        env::remove_var("FITCHECK_TEST_SECRET_EMPTY");
    }
}
