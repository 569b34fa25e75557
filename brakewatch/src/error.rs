use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ndarray::ShapeError;
use serde::Serialize;
use std::error::Error as _;
use thiserror::Error;

/// Errors raised while serving a prediction request.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model unavailable: {message}")]
    ModelUnavailable {
        message: String,
        trace: Option<String>,
    },

    #[error("Failed to read request body: {0}")]
    Body(#[from] BytesRejection),

    #[error("Invalid JSON body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid feature record: {0}")]
    InvalidRecord(#[source] serde_json::Error),

    #[error("Input shape mismatch: expected {expected} features, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Prediction failed: {0}")]
    Prediction(String),

    #[error("Shape error: {0}")]
    ShapeError(#[from] ShapeError),
}

impl InferenceError {
    pub fn status(&self) -> StatusCode {
        match self {
            // 413 for an oversized body, 400 for a broken stream.
            InferenceError::Body(rejection) => rejection.status(),
            InferenceError::InvalidJson(_)
            | InferenceError::InvalidInput(_)
            | InferenceError::InvalidRecord(_)
            | InferenceError::ShapeMismatch { .. } => StatusCode::BAD_REQUEST,
            InferenceError::ModelUnavailable { .. }
            | InferenceError::Prediction(_)
            | InferenceError::ShapeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic text for the `details` field: the stored load trace for an
    /// unavailable model, otherwise the source chain.
    pub fn details(&self) -> String {
        if let InferenceError::ModelUnavailable {
            trace: Some(trace), ..
        } = self
        {
            return trace.clone();
        }
        let mut out = format!("{self:?}");
        let mut source = self.source();
        while let Some(cause) = source {
            out.push_str(&format!("\nCaused by: {cause}"));
            source = cause.source();
        }
        out
    }

    /// Converts into a response, attaching details only when `expose_details` is set.
    pub fn into_api_error(self, expose_details: bool) -> ApiError {
        let details = expose_details.then(|| self.details());
        ApiError {
            status: self.status(),
            body: ErrorBody {
                error: self.to_string(),
                details,
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        err.into_api_error(false)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json_error() -> serde_json::Error {
        serde_json::from_str::<serde_json::Value>("{not json").unwrap_err()
    }

    #[test]
    fn test_model_unavailable_error() {
        let error = InferenceError::ModelUnavailable {
            message: "no model location found".to_string(),
            trace: None,
        };
        assert_eq!(
            error.to_string(),
            "Model unavailable: no model location found"
        );
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_shape_mismatch_error() {
        let error = InferenceError::ShapeMismatch {
            expected: 4,
            got: 3,
        };
        assert_eq!(
            error.to_string(),
            "Input shape mismatch: expected 4 features, got 3"
        );
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_input_errors_are_client_errors() {
        assert!(InferenceError::InvalidJson(json_error())
            .status()
            .is_client_error());
        assert!(InferenceError::InvalidInput("empty batch".into())
            .status()
            .is_client_error());
        assert!(InferenceError::InvalidRecord(json_error())
            .status()
            .is_client_error());
    }

    #[test]
    fn test_prediction_error_is_server_error() {
        let error = InferenceError::Prediction("non-finite score".into());
        assert!(error.status().is_server_error());
    }

    #[test]
    fn test_shape_error_conversion() {
        let shape_error = ShapeError::from_kind(ndarray::ErrorKind::OutOfBounds);
        let inference_error = InferenceError::from(shape_error);
        match inference_error {
            InferenceError::ShapeError(_) => {}
            _ => panic!("Expected ShapeError"),
        }
    }

    #[test]
    fn test_details_hidden_by_default() {
        let api = ApiError::from(InferenceError::InvalidJson(json_error()));
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert!(api.body.error.starts_with("Invalid JSON body"));
        assert!(api.body.details.is_none());
    }

    #[test]
    fn test_details_include_source_chain() {
        let api = InferenceError::InvalidJson(json_error()).into_api_error(true);
        let details = api.body.details.unwrap();
        assert!(details.contains("Caused by"));
    }

    #[test]
    fn test_details_use_stored_trace() {
        let error = InferenceError::ModelUnavailable {
            message: "boom".into(),
            trace: Some("boom\n\nCaused by:\n    disk".into()),
        };
        let api = error.into_api_error(true);
        assert_eq!(
            api.body.details.as_deref(),
            Some("boom\n\nCaused by:\n    disk")
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = InferenceError::InvalidInput("x".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = InferenceError::ModelUnavailable {
            message: "x".into(),
            trace: None,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let body = ErrorBody {
            error: "bad".into(),
            details: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"error": "bad"})
        );
    }
}
