use std::fmt::Debug;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use tracing::{error, warn};

use crate::api_types::{ErrorBody, ErrorKind, RpcResponse};
use crate::auth::AuthenticationError;
use crate::store::StoreError;
use crate::validation::ValidationError;

/// Errors an `/api` handler can answer with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("not signed in")]
    Unauthenticated,
    #[error("not allowed")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(color_eyre::Report),
}

impl From<color_eyre::Report> for ApiError {
    fn from(report: color_eyre::Report) -> Self {
        ApiError::Internal(report)
    }
}

pub type ApiResult<T> = Result<Rpc<T>, ApiError>;

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Authentication(_) => ErrorKind::Authentication,
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Unauthenticated => ErrorKind::Unauthenticated,
            ApiError::Forbidden => ErrorKind::Forbidden,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Authentication(_) | ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation(err) => ErrorBody {
                kind: self.kind(),
                message: err.message.clone(),
                field: Some(err.field.clone()),
            },
            ApiError::Internal(_) => ErrorBody {
                kind: self.kind(),
                message: "something went wrong".to_string(),
                field: None,
            },
            other => ErrorBody {
                kind: other.kind(),
                message: other.to_string(),
                field: None,
            },
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::UsernameTaken | StoreError::EmailTaken => {
                ApiError::Conflict(err.to_string())
            }
            StoreError::Database(err) => ApiError::Internal(err.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(report) => error!(error = ?report, "Request Error"),
            other => warn!(kind = ?other.kind(), error = %other, "Request rejected"),
        }

        let body: RpcResponse<()> = RpcResponse::Error { error: self.body() };
        (self.status(), Json(body)).into_response()
    }
}

/// Successful RPC payload, wrapped in the `{"status":"ok"}` envelope
#[derive(Debug)]
pub struct Rpc<T>(pub T);

impl<T: serde::Serialize> IntoResponse for Rpc<T> {
    fn into_response(self) -> Response {
        Json(RpcResponse::Ok { data: self.0 }).into_response()
    }
}

/// Error for page handlers: the report is logged, the response is what the browser gets
#[derive(Debug)]
pub struct ServerError<R: IntoResponse>(pub(crate) color_eyre::Report, pub(crate) R);

pub type ServerResult<S, F = Response> = Result<S, ServerError<F>>;

impl<R: IntoResponse> IntoResponse for ServerError<R> {
    fn into_response(self) -> Response {
        error!(error = ?self.0, "Request Error");
        self.1.into_response()
    }
}

impl<E> From<E> for ServerError<StatusCode>
where
    E: Into<color_eyre::Report>,
{
    fn from(err: E) -> Self {
        ServerError(err.into(), StatusCode::INTERNAL_SERVER_ERROR)
    }
}

pub(crate) trait WithStatus<T> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError<StatusCode>>;
}

impl<T, E: Into<color_eyre::Report>> WithStatus<T> for Result<T, E> {
    fn with_status(self, status: StatusCode) -> Result<T, ServerError<StatusCode>> {
        self.map_err(|err| ServerError(err.into(), status))
    }
}

pub(crate) trait WithRedirect<T> {
    fn with_redirect(self, redirect: Redirect) -> Result<T, ServerError<Redirect>>;
}

impl<T, E: Into<color_eyre::Report>> WithRedirect<T> for Result<T, E> {
    fn with_redirect(self, redirect: Redirect) -> Result<T, ServerError<Redirect>> {
        self.map_err(|err| ServerError(err.into(), redirect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_become_409() {
        let err: ApiError = StoreError::UsernameTaken.into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::Internal(color_eyre::eyre::eyre!("db password is hunter2"));
        let body = err.body();
        assert_eq!(body.kind, ErrorKind::Internal);
        assert!(!body.message.contains("hunter2"));
    }

    #[test]
    fn validation_errors_carry_the_field() {
        let err: ApiError = ValidationError::new("username", "too short").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body().field.as_deref(), Some("username"));
    }
}
