use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ride_request::RideStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("ride request not found")]
    NotFound,
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: RideStatus, to: RideStatus },
    #[error("ride request is no longer pending")]
    AlreadyAccepted,
    #[error("store read failed: {0}")]
    Read(#[source] sqlx::Error),
    #[error("store write failed: {0}")]
    Write(#[source] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Config(_)
            | AppError::Read(_)
            | AppError::Write(_)
            | AppError::Io(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidTransition { .. } | AppError::AlreadyAccepted => StatusCode::CONFLICT,
        };

        (status, self.to_string()).into_response()
    }
}
