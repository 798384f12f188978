use std::fmt;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::CONTENT_TYPE;
use tracing::info;

use super::rpc::RpcError;
use crate::storage::UploadTarget;
use crate::validation::ValidationError;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// An image picked by the user and held locally until the form is submitted
#[derive(Clone, PartialEq, Eq)]
pub struct StagedUpload {
    bytes: Vec<u8>,
    content_type: mime::Mime,
}

impl fmt::Debug for StagedUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedUpload")
            .field("content_type", &self.content_type.essence_str())
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl StagedUpload {
    /// Stage raw file bytes, sniffing the content type from the magic bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ValidationError> {
        if bytes.is_empty() {
            return Err(ValidationError::new("image", "file is empty"));
        }
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ValidationError::new("image", "must be at most 5 MiB"));
        }

        let content_type = infer::get(&bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .and_then(|kind| kind.mime_type().parse::<mime::Mime>().ok())
            .ok_or_else(|| ValidationError::new("image", "must be an image"))?;

        Ok(Self {
            bytes,
            content_type,
        })
    }

    pub fn content_type(&self) -> &mime::Mime {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:` URL for showing the staged image before it is uploaded
    pub fn preview_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type.essence_str(),
            STANDARD.encode(&self.bytes)
        )
    }
}

/// Moves staged bytes to a presigned [`UploadTarget`]
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn upload(&self, target: &UploadTarget, file: &StagedUpload) -> Result<(), RpcError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpUploader {
    client: reqwest::Client,
}

impl HttpUploader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectUploader for HttpUploader {
    async fn upload(&self, target: &UploadTarget, file: &StagedUpload) -> Result<(), RpcError> {
        let response = self
            .client
            .put(&target.url)
            .header(CONTENT_TYPE, file.content_type().essence_str())
            .body(file.bytes().to_vec())
            .send()
            .await
            .map_err(|err| RpcError::Upload(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Upload(format!("storage answered {status}")));
        }

        info!(key = %target.key, bytes = file.len(), "Uploaded object");
        Ok(())
    }
}
