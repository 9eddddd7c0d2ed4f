use axum::{
    http::{StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use tracing::info;

use super::error_responses::AppError;

const OPENAPI_YAML: &str = include_str!("../../openapi/openapi.yaml");

pub async fn not_found() -> impl IntoResponse {
    info!("backend router: not_found handler invoked");
    AppError::NotFound("not found".to_string())
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}

pub async fn openapi() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/yaml; charset=utf-8")],
        OPENAPI_YAML,
    )
}
