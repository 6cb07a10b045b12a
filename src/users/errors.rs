use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use crate::store::{StoreError, StoreErrorKind};
use crate::users::dto::Envelope;

/// Every way a user-directory request can fail. `Display` is the text sent to clients.
#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("No fields to update")]
    NoFields,
    #[error("No id provided")]
    NoId,
    #[error("Old password is required to change password")]
    OldPasswordRequired,
    #[error("Old password is wrong")]
    OldPasswordWrong,
    #[error("User not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::NoFields
            | UserError::NoId
            | UserError::OldPasswordRequired
            | UserError::OldPasswordWrong
            | UserError::Invalid(_) => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Store(e) if e.kind == StoreErrorKind::UniqueViolation => {
                StatusCode::CONFLICT
            }
            UserError::Hash(_) | UserError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(Envelope::fail(self.to_string()))).into_response()
    }
}
