use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::images::ImageStoreError;
use crate::middleware::logging::{to_response, ApiError};

/// Failures surfaced by the catalog stores. Each variant maps to one HTTP status.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Collaborator(String),
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::Collaborator(_) => StatusCode::BAD_REQUEST,
            StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Database details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            StoreError::Database(_) => "Erreur serveur".to_string(),
            other => other.to_string(),
        }
    }

    fn log_value(&self) -> ApiError {
        match self {
            StoreError::NotFound(msg) => ApiError::NotFound(msg.clone()),
            StoreError::Validation(msg) => ApiError::ValidationFail(msg.clone()),
            StoreError::Conflict(msg) => ApiError::Conflict(msg.clone()),
            StoreError::Collaborator(msg) => ApiError::Collaborator(msg.clone()),
            StoreError::Database(err) => ApiError::DbError(err.to_string()),
        }
    }
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                StoreError::Conflict("Une ressource avec ce slug existe déjà".to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

impl From<ValidationErrors> for StoreError {
    fn from(errors: ValidationErrors) -> Self {
        StoreError::Validation(validation_message(&errors))
    }
}

impl From<ImageStoreError> for StoreError {
    fn from(err: ImageStoreError) -> Self {
        StoreError::Collaborator(format!("Erreur lors de l'upload de l'image: {err}"))
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        to_response(
            (
                self.status(),
                Json(json!({
                    "success": false,
                    "error": self.public_message()
                })),
            ),
            Err(self.log_value()),
        )
    }
}

/// Joins every field message into one line, in a stable order.
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .map(|err| {
            err.message
                .as_ref()
                .map(|msg| msg.to_string())
                .unwrap_or_else(|| err.code.to_string())
        })
        .collect();
    messages.sort();
    messages.join(", ")
}
