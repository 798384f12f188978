use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use maud::{html, Markup, Render};
use serde::Deserialize;
use tracing::info;

use crate::{
    auth::{authenticate, create_account, end_session, issue_session, OptionalUser},
    components::{
        form::{Form as HtmlForm, InputField},
        layout::{Card, Notice, Page},
        ui::{avatar::Avatar, heading::Heading},
    },
    cookies::CookieJar,
    errors::{ApiError, ServerResult, WithRedirect, WithStatus},
    profile::ProfileView,
    session::Session,
    state::AppState,
    store::load_profile_view,
    user::profile_path,
    validation::{LoginRequest, RegisterRequest, Validate},
};

/// Root page handler - sends signed-in users to their own profile
pub async fn root_page(viewer: OptionalUser) -> Response {
    if let Some(identity) = viewer.identity {
        return Redirect::to(&profile_path(&identity.username)).into_response();
    }

    let content = html! {
        (Heading::h1("fitcheck").with_classes("text-center"))
        p class="text-gray-600 mb-6 text-center" { "Share your outfits and the links that go with them." }
        div class="flex justify-center gap-4" {
            a href="/login" class="rounded-lg bg-rose-500 px-4 py-2 font-medium text-white hover:bg-rose-600" { "Sign in" }
            a href="/register" class="rounded-lg border border-rose-300 px-4 py-2 font-medium text-rose-600 hover:bg-rose-50" { "Create an account" }
        }
    };

    Page::new("Welcome", Card::new(content)).into_response()
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

fn login_markup(email: &str, notice: Option<&str>) -> Page {
    let content = html! {
        (Heading::h1("Sign in").with_classes("text-center"))
        @if let Some(notice) = notice {
            (Notice(notice.to_string()))
        }
        (HtmlForm::post("/login", "Sign in", html! {
            (InputField::new("email").label("Email").input_type("email").value(email).required(true))
            (InputField::new("password").label("Password").input_type("password").required(true))
        }))
        p class="mt-4 text-center text-sm text-gray-600" {
            "New here? " a href="/register" class="text-rose-600 hover:underline" { "Create an account" }
        }
    };

    Page::new("Sign in", Card::new(content))
}

pub async fn login_page() -> Page {
    login_markup("", None)
}

pub async fn login_submit(
    State(state): State<AppState>,
    cookies: CookieJar,
    Form(form): Form<LoginForm>,
) -> ServerResult<Response, StatusCode> {
    let credentials = LoginRequest {
        email: form.email,
        password: Some(form.password),
    };

    let identity = match authenticate(
        state.store.as_ref(),
        state.passwords.as_ref(),
        &credentials,
    )
    .await
    {
        Ok(identity) => identity,
        Err(ApiError::Authentication(_)) => {
            let page = login_markup(&credentials.email, Some("Email or password is incorrect"));
            return Ok((StatusCode::UNAUTHORIZED, page).into_response());
        }
        Err(err) => return Err(err).with_status(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let session = issue_session(&state, &cookies, identity.into())
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Redirect::to(&profile_path(&session.username)).into_response())
}

#[derive(Deserialize)]
pub struct RegisterForm {
    email: String,
    username: String,
    password: String,
}

fn register_markup(email: &str, username: &str, notice: Option<&str>) -> Page {
    let content = html! {
        (Heading::h1("Create an account").with_classes("text-center"))
        @if let Some(notice) = notice {
            (Notice(notice.to_string()))
        }
        (HtmlForm::post("/register", "Create account", html! {
            (InputField::new("email").label("Email").input_type("email").value(email).required(true))
            (InputField::new("username").label("Username").placeholder("letters, digits, _").value(username).required(true))
            (InputField::new("password").label("Password").input_type("password").required(true))
        }))
        p class="mt-4 text-center text-sm text-gray-600" {
            "Already signed up? " a href="/login" class="text-rose-600 hover:underline" { "Sign in" }
        }
    };

    Page::new("Create an account", Card::new(content))
}

pub async fn register_page() -> Page {
    register_markup("", "", None)
}

pub async fn register_submit(
    State(state): State<AppState>,
    cookies: CookieJar,
    Form(form): Form<RegisterForm>,
) -> ServerResult<Response, StatusCode> {
    let request = RegisterRequest {
        email: form.email,
        username: form.username,
        password: form.password,
    };

    let rejected = |status: StatusCode, message: String| {
        let page = register_markup(&request.email, &request.username, Some(&message));
        (status, page).into_response()
    };

    if let Err(err) = request.validate() {
        return Ok(rejected(StatusCode::BAD_REQUEST, err.to_string()));
    }

    let identity = match create_account(&state, &request).await {
        Ok(identity) => identity,
        Err(err @ ApiError::Conflict(_)) => {
            return Ok(rejected(StatusCode::CONFLICT, err.to_string()));
        }
        Err(err) => return Err(err).with_status(StatusCode::INTERNAL_SERVER_ERROR),
    };

    let session = issue_session(&state, &cookies, Session::from(&identity))
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Redirect::to(&profile_path(&session.username)).into_response())
}

/// Logout route - clears the session cookie and redirects to home
pub async fn logout(cookies: CookieJar) -> Redirect {
    end_session(&cookies);
    info!("User logged out");
    Redirect::to("/")
}

fn profile_markup(profile: &ProfileView) -> Markup {
    html! {
        div class="flex flex-col items-center text-center" {
            (Avatar::new(profile.image.as_deref(), &profile.username).size("w-28 h-28"))
            (Heading::h1(&profile.username).with_classes("mt-4"))
            @if let Some(tagline) = &profile.tagline {
                p class="text-gray-600 mb-4" { (tagline) }
            }
            p class="text-sm text-gray-500 mb-4" {
                (profile.likes.count) @if profile.likes.count == 1 { " like" } @else { " likes" }
                @if profile.likes.liked { " · you like this" }
            }
        }

        @if !profile.links.is_empty() {
            ul class="space-y-2 mb-6" {
                @for link in &profile.links {
                    li {
                        a href=(link.url) rel="noopener nofollow" class="block rounded-lg border border-gray-200 px-4 py-2 text-rose-600 hover:bg-rose-50" {
                            span class="text-xs uppercase text-gray-400 mr-2" { (link.kind.as_str()) }
                            (link.url)
                        }
                    }
                }
            }
        }

        @if profile.posts.is_empty() {
            p class="text-center text-gray-400" { "No outfits yet." }
        } @else {
            div class="grid grid-cols-3 gap-2" {
                @for post in &profile.posts {
                    figure {
                        img src=(post.image) alt=(post.caption.as_deref().unwrap_or("outfit")) class="w-full aspect-square object-cover rounded-md" {}
                        @if let Some(caption) = &post.caption {
                            figcaption class="text-xs text-gray-500 mt-1" { (caption) }
                        }
                    }
                }
            }
        }

        @if profile.is_owner {
            div class="mt-6 pt-4 border-t border-gray-200 flex justify-center gap-4 text-sm" {
                a href="/settings" class="text-rose-600 hover:underline" { "Edit profile" }
                form method="post" action="/logout" {
                    button type="submit" class="text-gray-500 hover:underline" { "Sign out" }
                }
            }
        }
    }
}

pub async fn profile_page(
    State(state): State<AppState>,
    viewer: OptionalUser,
    Path(username): Path<String>,
) -> ServerResult<Response, StatusCode> {
    let viewer_id = viewer.identity.as_ref().map(|identity| identity.id);

    let Some(profile) = load_profile_view(state.store.as_ref(), viewer_id, &username)
        .await
        .with_status(StatusCode::INTERNAL_SERVER_ERROR)?
    else {
        let content = html! {
            (Heading::h2("Profile not found").with_classes("text-center"))
            p class="text-center text-gray-600" { "No one goes by " (username) " here." }
        };
        return Ok((StatusCode::NOT_FOUND, Page::new("Not found", Card::new(content))).into_response());
    };

    let title = profile.username.clone();
    let content = profile_markup(&profile);
    Ok(Page::new(&title, Card::new(content).with_max_width("max-w-2xl")).into_response())
}

/// Owner-only overview of the account; edits go through the `/api` surface
pub async fn settings_page(
    State(state): State<AppState>,
    viewer: OptionalUser,
) -> ServerResult<Response, Redirect> {
    let Some(identity) = viewer.identity else {
        return Ok(Redirect::to("/login").into_response());
    };

    let links = state
        .store
        .list_links(identity.id)
        .await
        .with_redirect(Redirect::to(&profile_path(&identity.username)))?;
    let me = identity.to_me(links);

    let content = html! {
        (Heading::h1("Settings"))
        dl class="grid grid-cols-3 gap-2 text-sm mb-6" {
            dt class="text-gray-500" { "Username" } dd class="col-span-2" { (me.username) }
            dt class="text-gray-500" { "Email" } dd class="col-span-2" { (me.email) }
            dt class="text-gray-500" { "Tagline" } dd class="col-span-2" { (me.tagline.as_deref().unwrap_or("-")) }
            dt class="text-gray-500" { "Links" } dd class="col-span-2" { (me.links.len()) }
        }
        a href=(profile_path(&me.username)) class="text-rose-600 hover:underline" { "Back to profile" }
    };

    Ok(Page::new("Settings", Card::new(content).render()).into_response())
}
