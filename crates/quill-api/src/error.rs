use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use quill_db::StoreError;
use quill_types::state::ActionState;

use crate::auth::AuthError;
use crate::form::ValidationError;

/// Everything that can stop an action. Actions never return this to the
/// client; it is folded into a result state by [`settle`].
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The target is missing or belongs to another user.
    #[error("not found")]
    NotFound,

    #[error("daily message limit reached")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Maps an action outcome onto the client-visible state. Unclassified
/// failures are logged here before collapsing to `failed`.
pub fn settle(action: &str, outcome: Result<(), ActionError>) -> ActionState {
    match outcome {
        Ok(()) => ActionState::Success,
        Err(ActionError::Validation(e)) => {
            debug!("{} rejected payload: {}", action, e);
            ActionState::InvalidData
        }
        Err(ActionError::NotFound | ActionError::Store(StoreError::NotFound(_))) => {
            ActionState::NotFound
        }
        Err(ActionError::RateLimited) => ActionState::RateLimited,
        Err(e) => {
            error!("{} failed: {}", action, e);
            ActionState::Failed
        }
    }
}

/// Errors of the JSON loaders, rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("internal server error")]
    Internal,
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::NotFound | ActionError::Store(StoreError::NotFound(_)) => Self::NotFound,
            ActionError::Store(StoreError::InvalidCursor) => {
                Self::BadRequest(StoreError::InvalidCursor.to_string())
            }
            ActionError::Validation(e) => Self::BadRequest(e.to_string()),
            other => {
                error!("Loader failed: {}", other);
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
