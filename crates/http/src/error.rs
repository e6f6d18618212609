//! Error handling for the shelf HTTP layer

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Replacement for error details in production deployments.
pub const SUPPRESSED_DETAIL: &str = "An error occurred";

/// Body of every error response: `{message, error?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Same message, detail replaced by [`SUPPRESSED_DETAIL`] when present.
    pub fn redacted(&self) -> Self {
        Self {
            message: self.message.clone(),
            error: self.error.as_ref().map(|_| SUPPRESSED_DETAIL.to_string()),
        }
    }
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {message}")]
    BadRequest {
        message: String,
        detail: Option<String>,
    },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("timed out: {message}: {detail}")]
    Timeout { message: String, detail: String },

    #[error("{message}: {detail}")]
    Server { message: String, detail: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error without detail
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            detail: None,
        }
    }

    /// Create a bad request error carrying a diagnostic detail
    pub fn bad_request_with(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a timeout error; surfaced as 500 with its own message
    pub fn timeout(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Create a server-side failure
    pub fn server(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Timeout { .. } | AppError::Server { .. } | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Split into status and the unredacted body.
    pub fn into_parts(self) -> (StatusCode, ErrorBody) {
        let status = self.status();
        let body = match self {
            AppError::BadRequest { message, detail } => ErrorBody {
                message,
                error: detail,
            },
            AppError::NotFound { message } => ErrorBody {
                message,
                error: None,
            },
            AppError::Timeout { message, detail } | AppError::Server { message, detail } => {
                ErrorBody {
                    message,
                    error: Some(detail),
                }
            }
            AppError::Internal(e) => ErrorBody {
                message: "Something went wrong!".to_string(),
                error: Some(format!("{e:#}")),
            },
        };
        (status, body)
    }
}

/// Marker left on error responses so the redaction middleware can rewrite
/// them without parsing the body.
#[derive(Debug, Clone)]
pub(crate) struct RenderedError(pub(crate) ErrorBody);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let (status, body) = self.into_parts();

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                message = %body.message,
                detail = body.error.as_deref().unwrap_or_default(),
                "request failed"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                message = %body.message,
                detail = body.error.as_deref().unwrap_or_default(),
                "request rejected"
            );
        }

        let mut response = (status, Json(&body)).into_response();
        response.extensions_mut().insert(RenderedError(body));
        response
    }
}

/// Response middleware that hides error details; installed for production.
pub async fn redact_error_details(response: Response) -> Response {
    let redacted = match response.extensions().get::<RenderedError>() {
        Some(RenderedError(body)) if body.error.is_some() => body.redacted(),
        _ => return response,
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    (parts, Json(redacted)).into_response()
}

/// JSON body extractor whose rejections are reported as 400 `{message, error}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::bad_request_with(
                "Invalid request body",
                rejection.body_text(),
            )),
        }
    }
}
