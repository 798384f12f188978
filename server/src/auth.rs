use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{error, info, warn};

use crate::cookies::CookieJar;
use crate::errors::ApiError;
use crate::password::PasswordScheme;
use crate::session::Session;
use crate::state::AppState;
use crate::store::Store;
use crate::user::{normalize_email, Identity, NewIdentity, PublicIdentity};
use crate::validation::{LoginRequest, RegisterRequest};

/// Bad credentials. Both variants are user-correctable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("no such user")]
    NoSuchUser,
    #[error("credential mismatch")]
    CredentialMismatch,
}

/// Check an email/password pair against the stored identity.
///
/// Never calls into `passwords` when the email is unknown. The returned
/// projection carries no password hash.
pub async fn authenticate(
    store: &dyn Store,
    passwords: &dyn PasswordScheme,
    credentials: &LoginRequest,
) -> Result<PublicIdentity, ApiError> {
    let email = normalize_email(&credentials.email);

    let Some(identity) = store.find_identity_by_email(&email).await? else {
        info!("Login rejected: no such user");
        return Err(AuthenticationError::NoSuchUser.into());
    };

    let (Some(hash), Some(password)) = (
        identity.password_hash.as_deref(),
        credentials.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        info!(user_id = %identity.id, "Login rejected: missing password or hash");
        return Err(AuthenticationError::CredentialMismatch.into());
    };

    if !passwords.verify(password, hash)? {
        info!(user_id = %identity.id, "Login rejected: credential mismatch");
        return Err(AuthenticationError::CredentialMismatch.into());
    }

    info!(user_id = %identity.id, "Credentials accepted");
    Ok(identity.to_public())
}

/// Hash the password and store a new, non-admin identity
pub async fn create_account(
    state: &AppState,
    request: &RegisterRequest,
) -> Result<Identity, ApiError> {
    let password_hash = state.passwords.hash(&request.password)?;

    let identity = state
        .store
        .create_identity(NewIdentity {
            username: request.username.trim().to_string(),
            email: normalize_email(&request.email),
            password_hash: Some(password_hash),
            admin: false,
        })
        .await?;
    info!(user_id = %identity.id, "Registered new user");

    Ok(identity)
}

/// Sign a session for `identity` and store it in the session cookie
pub fn issue_session(
    state: &AppState,
    cookies: &CookieJar,
    session: Session,
) -> Result<Session, ApiError> {
    let token = state.sessions.issue(&session, Utc::now())?;
    cookies.set_session_token(token);
    info!(user_id = %session.user_id, "Issued session");
    Ok(session)
}

/// Clear the session cookie
pub fn end_session(cookies: &CookieJar) {
    cookies.clear_session();
    info!("Session cookie removed");
}

/// Resolve the session cookie to the live identity, sliding the expiry when due.
///
/// Invalid, expired or orphaned tokens clear the cookie and yield `None`.
async fn current_identity(
    state: &AppState,
    cookies: &CookieJar,
) -> Result<Option<Identity>, ApiError> {
    let Some(token) = cookies.session_token() else {
        return Ok(None);
    };

    let verified = match state.sessions.verify(&token) {
        Ok(verified) => verified,
        Err(err) => {
            info!("Session token rejected: {}", err);
            cookies.clear_session();
            return Ok(None);
        }
    };

    let Some(identity) = state.store.find_identity(verified.session.user_id).await? else {
        warn!(user_id = %verified.session.user_id, "Session refers to a deleted user");
        cookies.clear_session();
        return Ok(None);
    };

    if verified.needs_refresh(Utc::now()) {
        issue_session(state, cookies, Session::from(&identity))?;
    }

    Ok(Some(identity))
}

/// Extract the current user from the request if authenticated
#[derive(Clone)]
pub struct AuthUser {
    pub identity: Identity,
    pub cookies: CookieJar,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = CookieJar::from_request_parts(parts, state).await?;

        match current_identity(state, &cookies).await {
            Ok(Some(identity)) => Ok(AuthUser { identity, cookies }),
            Ok(None) => Err(ApiError::Unauthenticated.into_response()),
            Err(err) => {
                error!("Error validating session: {:?}", err);
                Err(err.into_response())
            }
        }
    }
}

/// Extract an authenticated admin user from the request
/// Requires both authentication and admin privileges
#[derive(Clone)]
pub struct AdminUser {
    pub identity: Identity,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;

        if !auth_user.identity.admin {
            error!(
                "User {} attempted to access admin area without admin privileges",
                auth_user.identity.id
            );
            return Err(ApiError::Forbidden.into_response());
        }

        Ok(AdminUser {
            identity: auth_user.identity,
        })
    }
}

/// Extract the optional user from the request if authenticated
#[derive(Clone)]
pub struct OptionalUser {
    pub identity: Option<Identity>,
    pub cookies: CookieJar,
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = CookieJar::from_request_parts(parts, state).await?;

        match current_identity(state, &cookies).await {
            Ok(identity) => Ok(OptionalUser { identity, cookies }),
            Err(err) => {
                error!("Error validating session: {:?}", err);
                Err(err.into_response())
            }
        }
    }
}
