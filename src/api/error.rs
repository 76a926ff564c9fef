use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use crate::karma::{KarmaError, valid_actions};

impl KarmaError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            KarmaError::AccountNotFound(_) => StatusCode::NOT_FOUND,
            KarmaError::UnknownAction(_) | KarmaError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            KarmaError::AccountExists(_) => StatusCode::CONFLICT,
            KarmaError::PersistenceFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for KarmaError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            KarmaError::UnknownAction(_) => json!({
                "error": self.to_string(),
                "valid_actions": valid_actions(),
            }),
            KarmaError::PersistenceFailure(detail) => {
                error!(detail = %detail, "Request failed in storage layer");
                json!({ "error": "Failed to persist karma data" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
