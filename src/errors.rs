use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Request body exceeds the {0} MiB limit")]
    PayloadTooLarge(u64),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GalleryError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl GalleryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GalleryError::Validation(_) => StatusCode::BAD_REQUEST,
            GalleryError::NotFound(_) => StatusCode::NOT_FOUND,
            GalleryError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            GalleryError::Storage(_) | GalleryError::Persistence(_) | GalleryError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GalleryError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Faults are logged in full but never echoed back to the client.
        let message = match &self {
            GalleryError::Storage(e) => {
                tracing::error!(error = %e, "storage fault");
                "Internal server error".to_string()
            }
            GalleryError::Persistence(e) => {
                tracing::error!(error = %e, "database fault");
                "Internal server error".to_string()
            }
            GalleryError::Config(e) => {
                tracing::error!(error = %e, "configuration fault");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_not_found_display() {
        let err = GalleryError::NotFound("File".to_string());
        assert_eq!(err.to_string(), "File not found");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            GalleryError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GalleryError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            GalleryError::PayloadTooLarge(1).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(
            GalleryError::from(io).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            GalleryError::from(sqlx::Error::PoolClosed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_fault_details_are_hidden() {
        let io = std::io::Error::other("/secret/path is full");
        let response = GalleryError::from(io).into_response();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_validation_message_is_returned() {
        let response = GalleryError::Validation("Empty file name".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Empty file name");
    }
}
