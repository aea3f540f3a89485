use crate::commands::CommandError;
use crate::config::AppConfig;
use crate::middleware::upload::UploadError;
use crate::services::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Every way a products request can fail, as seen by the client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client sent something unusable. `status` is already resolved
    /// against [`AppConfig::validation_status`].
    #[error("{message}")]
    Rejected { message: String, status: StatusCode },

    #[error("Auth failed")]
    Unauthorized,

    #[error("No valid entry found for provided ID")]
    EntryNotFound,

    #[error("Product not found!")]
    ProductNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn rejected(config: &AppConfig, client_status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            message: message.into(),
            status: config.validation_status(client_status),
        }
    }

    pub fn from_command(config: &AppConfig, err: CommandError) -> Self {
        match err {
            CommandError::Schema(err) => {
                ApiError::rejected(config, StatusCode::BAD_REQUEST, err.to_string())
            }
            CommandError::Store(err) => ApiError::Store(err),
        }
    }

    pub fn from_upload(config: &AppConfig, err: UploadError) -> Self {
        let client_status = match &err {
            UploadError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::TooLarge { .. } | UploadError::FieldTooLarge(_) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            UploadError::UnexpectedField(_) | UploadError::Multipart(_) => StatusCode::BAD_REQUEST,
            UploadError::Io(_) => return ApiError::Internal(err.to_string()),
        };

        ApiError::rejected(config, client_status, err.to_string())
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Rejected { status, .. } => *status,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::EntryNotFound | ApiError::ProductNotFound => StatusCode::NOT_FOUND,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }

        let body = match self {
            ApiError::Unauthorized | ApiError::EntryNotFound | ApiError::ProductNotFound => {
                json!({ "message": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(status).json(body)
    }
}
