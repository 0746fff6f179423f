use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("database error: {0}")]
    SqlxDatabase(#[from] sqlx::Error),
    #[error("multipart error: {0}")]
    MultipartError(#[from] MultipartError),
    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if cfg!(debug_assertions) {
            error!("{:#?}", self);
        }
        match self {
            ApiError::SqlxDatabase(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error").into_response()
            }
            ApiError::MultipartError(err) => (err.status(), err.body_text()).into_response(),
            ApiError::IoError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to save file").into_response()
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "File not found").into_response(),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
        }
    }
}
