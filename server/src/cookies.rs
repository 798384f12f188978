use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse as _, Response},
};
use time::Duration;
use tracing::error;

pub use tower_cookies::Cookie;

use crate::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Request cookies plus the settings needed to write the session cookie
#[derive(Clone)]
pub struct CookieJar {
    cookies: tower_cookies::Cookies,
    secure: bool,
    lifetime_days: i64,
}

#[async_trait]
impl FromRequestParts<AppState> for CookieJar {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = match tower_cookies::Cookies::from_request_parts(parts, state).await {
            Ok(cookies) => cookies,
            Err(_) => {
                error!("Failed to extract cookies from request");
                return Err(StatusCode::INTERNAL_SERVER_ERROR.into_response());
            }
        };

        Ok(CookieJar {
            cookies,
            secure: state.secure_cookies(),
            lifetime_days: state.sessions.lifetime().num_days(),
        })
    }
}

impl CookieJar {
    /// The raw session token, if the browser sent one
    pub fn session_token(&self) -> Option<String> {
        self.cookies
            .get(SESSION_COOKIE_NAME)
            .map(|cookie| cookie.value().to_string())
    }

    pub fn set_session_token(&self, token: String) {
        let mut cookie = self.base_cookie(token);
        cookie.set_max_age(Duration::days(self.lifetime_days));
        self.cookies.add(cookie);
    }

    /// Removes the session cookie by expiring it immediately
    pub fn clear_session(&self) {
        let mut cookie = self.base_cookie(String::new());
        cookie.set_max_age(Duration::seconds(-1));
        self.cookies.remove(cookie);
    }

    fn base_cookie(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE_NAME, value);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
        cookie.set_secure(self.secure);
        cookie
    }
}
