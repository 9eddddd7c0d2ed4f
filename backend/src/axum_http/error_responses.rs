use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::usecases::subscriptions::SubscriptionError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub data: T,
}

#[derive(Debug, Default, Serialize)]
pub struct EmptyResponse {}

pub fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(SuccessResponse { data })).into_response()
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl From<SubscriptionError> for AppError {
    fn from(err: SubscriptionError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            StatusCode::BAD_REQUEST => AppError::BadRequest(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            _ => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}
