pub mod api_types;
pub mod auth;
pub mod client;
pub mod components;
pub mod cookies;
pub mod errors;
pub mod password;
pub mod profile;
pub mod routes;
pub mod session;
pub mod setup;
pub mod state;
pub mod storage;
pub mod store;
pub mod user;
pub mod validation;
