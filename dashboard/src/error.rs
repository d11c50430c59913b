use aggregation::AggregationError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Invalid device_id. Allowed characters: A-Za-z0-9.")]
    InvalidDeviceId,
    #[error("Invalid device_password. Allowed characters: A-Za-z0-9 and @#$%^&*!.")]
    InvalidDevicePassword,
    #[error("Device '{device_id}' is already registered.")]
    DeviceExists { device_id: String },
    #[error("Device not found.")]
    DeviceNotFound,
    #[error("Invalid device credentials.")]
    InvalidCredentials,
    #[error("Device is already claimed.")]
    AlreadyClaimed,
    #[error("predicted_label must not be empty.")]
    EmptyLabel,
    #[error("model_type must not be empty.")]
    MissingModelType,
    #[error("Sex must be 'F' or 'M'.")]
    InvalidSex,
    #[error("{field} must be a number.")]
    InvalidSurveyNumber { field: &'static str },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("Not authenticated.")]
    Unauthenticated,
    #[error("Device not found.")]
    NotFound,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::DeviceNotFound) | ApiError::NotFound => {
                StatusCode::NOT_FOUND
            }
            ApiError::Store(StoreError::InvalidCredentials) | ApiError::Unauthenticated => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Store(StoreError::DeviceExists { .. } | StoreError::AlreadyClaimed) => {
                StatusCode::CONFLICT
            }
            ApiError::Store(
                StoreError::InvalidDeviceId
                | StoreError::InvalidDevicePassword
                | StoreError::EmptyLabel
                | StoreError::MissingModelType
                | StoreError::InvalidSex
                | StoreError::InvalidSurveyNumber { .. },
            )
            | ApiError::Aggregation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
