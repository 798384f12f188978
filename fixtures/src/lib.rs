//! Stand-ins for the services fitcheck talks to, for local development and tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use chrono::Utc;
use clap::Parser;
use fitcheck::client::MAX_UPLOAD_BYTES;
use fitcheck::storage::{UploadParams, UploadSigner};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Common CLI arguments for all fixture servers
#[derive(Parser, Debug, Clone)]
pub struct FixtureArgs {
    /// The port to listen on
    #[arg(short, long, default_value = "0")]
    pub port: u16,

    /// The host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,
}

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    bytes: Bytes,
}

/// Object store that only accepts signed image `PUT`s of at most [`MAX_UPLOAD_BYTES`]
#[derive(Clone)]
pub struct StorageState {
    signer: UploadSigner,
    objects: Arc<Mutex<HashMap<String, StoredObject>>>,
}

impl StorageState {
    pub fn new(signer: UploadSigner) -> Self {
        Self {
            signer,
            objects: Arc::default(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

pub fn storage_router(state: StorageState) -> Router {
    Router::new()
        .route("/uploads/*key", put(put_object))
        .route("/objects/*key", get(get_object))
        .route("/", get(|| async { "Storage Fixture Server" }))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

async fn put_object(
    State(state): State<StorageState>,
    Path(key): Path<String>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(rejection) = state.signer.verify(&key, &params, Utc::now()) {
        warn!(%key, %rejection, "Upload rejected");
        return (StatusCode::FORBIDDEN, rejection.to_string()).into_response();
    }

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    if !content_type.starts_with("image/") {
        warn!(%key, %content_type, "Upload rejected: not an image");
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("{content_type} is not an image type"),
        )
            .into_response();
    }

    info!(%key, bytes = body.len(), %content_type, "Stored object");
    state
        .objects
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(
            key,
            StoredObject {
                content_type,
                bytes: body,
            },
        );

    StatusCode::CREATED.into_response()
}

async fn get_object(State(state): State<StorageState>, Path(key): Path<String>) -> Response {
    let object = state
        .objects
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&key)
        .cloned();

    match object {
        Some(object) => ([(CONTENT_TYPE, object.content_type)], object.bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Bind `app` on an ephemeral localhost port in the background
pub async fn spawn_server(app: Router) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "Fixture server stopped");
        }
    });

    Ok(addr)
}

/// Common function to run a fixture server
pub async fn run_server(args: FixtureArgs, app: Router) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = format!("{}:{}", args.host, args.port).parse::<SocketAddr>()?;
    let app = app.layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Fixture server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
