//! JSON RPC handlers consumed by [`crate::client`].
//!
//! Every handler answers with the [`RpcResponse`](crate::api_types::RpcResponse)
//! envelope, via [`Rpc`](crate::errors::Rpc) on success and
//! [`ApiError`] on failure.

mod admin;
mod auth;
mod me;
mod posts;
mod profiles;

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    routing::{delete, get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;

use crate::errors::ApiError;
use crate::state::AppState;
use crate::validation::{Validate, ValidationError};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/auth/session",
            get(auth::session).post(auth::refresh_session),
        )
        .route(
            "/me",
            get(me::get_me)
                .patch(me::edit_profile)
                .delete(me::delete_profile),
        )
        .route(
            "/me/image",
            post(me::set_image)
                .put(me::confirm_image)
                .delete(me::delete_image),
        )
        .route("/me/links", post(me::add_link))
        .route("/me/links/:id", delete(me::delete_link))
        .route("/profiles/:username", get(profiles::get_profile))
        .route("/likes/:id", post(profiles::like_profile))
        .route("/posts", post(posts::create_post))
        .route("/posts/:id", delete(posts::delete_post))
        .route("/posts/:id/report", post(posts::report_post))
        .route("/admin/users/:id", delete(admin::delete_user))
        .route("/admin/posts/:id", delete(admin::delete_post))
}

/// JSON body that deserialised into a closed request struct and passed [`Validate`]
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ValidationError::new("body", rejection.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}
