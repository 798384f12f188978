use axum::{
    extract::State,
    routing::{get, post},
    Json,
};
use serde_json::{json, Value};
use tower_cookies::CookieManagerLayer;

use crate::state::AppState;

pub mod api;
pub mod pages;

/// Build the application router with all routes
pub fn routes(app_state: AppState) -> axum::Router {
    axum::Router::new()
        // Pages
        .route("/", get(pages::root_page))
        .route("/login", get(pages::login_page).post(pages::login_submit))
        .route(
            "/register",
            get(pages::register_page).post(pages::register_submit),
        )
        .route("/logout", post(pages::logout))
        .route("/settings", get(pages::settings_page))
        .route("/u/:username", get(pages::profile_page))
        .route("/health", get(health))
        // Typed RPC surface
        .nest("/api", api::routes())
        .layer(CookieManagerLayer::new())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(sentry_tower::SentryHttpLayer::with_transaction())
        .layer(sentry_tower::NewSentryLayer::<axum::extract::Request>::new_from_top())
        .with_state(app_state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "version": state.version() }))
}
