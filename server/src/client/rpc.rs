use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::api_types::{ErrorKind, RpcResponse};
use crate::profile::{CreatedPost, LikeState, ProfileLink, ProfileView};
use crate::session::Session;
use crate::storage::UploadTarget;
use crate::user::MeView;
use crate::validation::{
    AddLinkRequest, ConfirmImageRequest, CreatePostRequest, EditProfileRequest, LoginRequest,
    RegisterRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RpcError {
    /// The server answered with an error envelope
    #[error("{message}")]
    Server {
        kind: ErrorKind,
        message: String,
        field: Option<String>,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response ({0})")]
    UnexpectedResponse(StatusCode),
    #[error("upload failed: {0}")]
    Upload(String),
}

impl RpcError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RpcError::Server { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        RpcError::Network(err.to_string())
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

/// One method per `/api` operation
#[async_trait]
pub trait Rpc: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> RpcResult<Session>;
    async fn login(&self, request: &LoginRequest) -> RpcResult<Session>;
    async fn logout(&self) -> RpcResult<()>;
    async fn session(&self) -> RpcResult<Option<Session>>;
    async fn refresh_session(&self) -> RpcResult<Session>;

    async fn get_me(&self) -> RpcResult<MeView>;
    async fn edit_profile(&self, request: &EditProfileRequest) -> RpcResult<MeView>;
    async fn delete_profile(&self) -> RpcResult<()>;
    async fn set_image(&self) -> RpcResult<UploadTarget>;
    async fn confirm_image(&self, request: &ConfirmImageRequest) -> RpcResult<MeView>;
    async fn delete_image(&self) -> RpcResult<MeView>;
    async fn add_link(&self, request: &AddLinkRequest) -> RpcResult<ProfileLink>;
    async fn delete_link(&self, link: Uuid) -> RpcResult<()>;

    async fn get_profile(&self, username: &str) -> RpcResult<ProfileView>;
    async fn like_profile(&self, target: Uuid) -> RpcResult<LikeState>;

    async fn create_post(&self, request: &CreatePostRequest) -> RpcResult<CreatedPost>;
    async fn delete_post(&self, post: Uuid) -> RpcResult<()>;
    async fn report_post(&self, post: Uuid) -> RpcResult<()>;

    async fn admin_delete_user(&self, user: Uuid) -> RpcResult<()>;
    async fn admin_delete_post(&self, post: Uuid) -> RpcResult<()>;
}

/// [`Rpc`] over HTTP. Keeps the session cookie in its own cookie store.
#[derive(Debug, Clone)]
pub struct HttpRpc {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRpc {
    pub fn new(base_url: &str) -> RpcResult<Self> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> RpcResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{}/api{}", self.base_url, path);
        debug!(%method, %url, "RPC call");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        match serde_json::from_slice::<RpcResponse<T>>(&bytes) {
            Ok(RpcResponse::Ok { data }) => Ok(data),
            Ok(RpcResponse::Error { error }) => Err(RpcError::Server {
                kind: error.kind,
                message: error.message,
                field: error.field,
            }),
            Err(_) => Err(RpcError::UnexpectedResponse(status)),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> RpcResult<T> {
        self.call::<(), T>(Method::GET, path, None).await
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str) -> RpcResult<T> {
        self.call::<(), T>(method, path, None).await
    }
}

#[async_trait]
impl Rpc for HttpRpc {
    async fn register(&self, request: &RegisterRequest) -> RpcResult<Session> {
        self.call(Method::POST, "/auth/register", Some(request)).await
    }

    async fn login(&self, request: &LoginRequest) -> RpcResult<Session> {
        self.call(Method::POST, "/auth/login", Some(request)).await
    }

    async fn logout(&self) -> RpcResult<()> {
        self.send(Method::POST, "/auth/logout").await
    }

    async fn session(&self) -> RpcResult<Option<Session>> {
        self.get("/auth/session").await
    }

    async fn refresh_session(&self) -> RpcResult<Session> {
        self.send(Method::POST, "/auth/session").await
    }

    async fn get_me(&self) -> RpcResult<MeView> {
        self.get("/me").await
    }

    async fn edit_profile(&self, request: &EditProfileRequest) -> RpcResult<MeView> {
        self.call(Method::PATCH, "/me", Some(request)).await
    }

    async fn delete_profile(&self) -> RpcResult<()> {
        self.send(Method::DELETE, "/me").await
    }

    async fn set_image(&self) -> RpcResult<UploadTarget> {
        self.send(Method::POST, "/me/image").await
    }

    async fn confirm_image(&self, request: &ConfirmImageRequest) -> RpcResult<MeView> {
        self.call(Method::PUT, "/me/image", Some(request)).await
    }

    async fn delete_image(&self) -> RpcResult<MeView> {
        self.send(Method::DELETE, "/me/image").await
    }

    async fn add_link(&self, request: &AddLinkRequest) -> RpcResult<ProfileLink> {
        self.call(Method::POST, "/me/links", Some(request)).await
    }

    async fn delete_link(&self, link: Uuid) -> RpcResult<()> {
        self.send(Method::DELETE, &format!("/me/links/{link}")).await
    }

    async fn get_profile(&self, username: &str) -> RpcResult<ProfileView> {
        self.get(&format!("/profiles/{}", urlencoding::encode(username)))
            .await
    }

    async fn like_profile(&self, target: Uuid) -> RpcResult<LikeState> {
        self.send(Method::POST, &format!("/likes/{target}")).await
    }

    async fn create_post(&self, request: &CreatePostRequest) -> RpcResult<CreatedPost> {
        self.call(Method::POST, "/posts", Some(request)).await
    }

    async fn delete_post(&self, post: Uuid) -> RpcResult<()> {
        self.send(Method::DELETE, &format!("/posts/{post}")).await
    }

    async fn report_post(&self, post: Uuid) -> RpcResult<()> {
        self.send(Method::POST, &format!("/posts/{post}/report"))
            .await
    }

    async fn admin_delete_user(&self, user: Uuid) -> RpcResult<()> {
        self.send(Method::DELETE, &format!("/admin/users/{user}"))
            .await
    }

    async fn admin_delete_post(&self, post: Uuid) -> RpcResult<()> {
        self.send(Method::DELETE, &format!("/admin/posts/{post}"))
            .await
    }
}
