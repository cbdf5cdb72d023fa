use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),

    #[error("Text detection unavailable: {0}")]
    DetectionUnavailable(String),

    #[error("Failed to encode annotated image: {0}")]
    EncodingError(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Missing file in request")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`ValidatorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidImage,
    InvalidThreshold,
    DetectionUnavailable,
    EncodingError,
    Request,
    Configuration,
    Internal,
}

impl ValidatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidatorError::InvalidImage(_) => ErrorKind::InvalidImage,
            ValidatorError::InvalidThreshold(_) => ErrorKind::InvalidThreshold,
            ValidatorError::DetectionUnavailable(_) => ErrorKind::DetectionUnavailable,
            ValidatorError::EncodingError(_) => ErrorKind::EncodingError,
            ValidatorError::ImageTooLarge { .. }
            | ValidatorError::MissingFile
            | ValidatorError::InvalidRequest(_) => ErrorKind::Request,
            ValidatorError::Configuration(_) => ErrorKind::Configuration,
            ValidatorError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code returned to callers
    pub fn code(&self) -> &'static str {
        match self {
            ValidatorError::InvalidImage(_) => "INVALID_IMAGE",
            ValidatorError::InvalidThreshold(_) => "INVALID_THRESHOLD",
            ValidatorError::DetectionUnavailable(_) => "DETECTION_UNAVAILABLE",
            ValidatorError::EncodingError(_) => "ENCODING_ERROR",
            ValidatorError::ImageTooLarge { .. } => "IMAGE_TOO_LARGE",
            ValidatorError::MissingFile => "MISSING_FILE",
            ValidatorError::InvalidRequest(_) => "INVALID_REQUEST",
            ValidatorError::Configuration(_) => "CONFIGURATION_ERROR",
            ValidatorError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ValidatorError::InvalidImage(_)
            | ValidatorError::InvalidThreshold(_)
            | ValidatorError::MissingFile
            | ValidatorError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ValidatorError::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ValidatorError::DetectionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ValidatorError::EncodingError(_)
            | ValidatorError::Configuration(_)
            | ValidatorError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ValidatorError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_map_to_their_own_kind() {
        assert_eq!(
            ValidatorError::InvalidImage("empty".into()).kind(),
            ErrorKind::InvalidImage
        );
        assert_eq!(
            ValidatorError::InvalidThreshold("1.5".into()).kind(),
            ErrorKind::InvalidThreshold
        );
        assert_eq!(
            ValidatorError::DetectionUnavailable("timeout".into()).kind(),
            ErrorKind::DetectionUnavailable
        );
        assert_eq!(
            ValidatorError::EncodingError("png".into()).kind(),
            ErrorKind::EncodingError
        );
    }

    #[test]
    fn test_detection_unavailable_is_service_unavailable() {
        let response = ValidatorError::DetectionUnavailable("model missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_too_large_is_payload_too_large() {
        let err = ValidatorError::ImageTooLarge { size: 10, max: 5 };
        assert_eq!(err.code(), "IMAGE_TOO_LARGE");
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
