use crate::db::StoreError;
use crate::voting::PollError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] PollError),

    // Body or query string that could not be parsed
    #[error("{0}")]
    BadRequest(String),

    #[error("Missing required credential: {0}")]
    MissingCredentials(&'static str),

    #[error("Invalid interactive credentials")]
    InvalidCredentials,

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    /// Attaches a short description of the failed operation to a store error.
    /// A change refused by poll validation stays a validation error.
    pub fn store(context: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| match source {
            StoreError::Rejected(err) => AppError::Validation(err),
            source => AppError::Store { context, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredentials(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Store { source: StoreError::LockConflict(_), .. } => StatusCode::CONFLICT,
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("Request rejected ({}): {}", status, self);
        }

        (status, Json(json!({ "success": false, "message": self.to_string() }))).into_response()
    }
}
