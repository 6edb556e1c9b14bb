use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use missive_core::ChatError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// A typed failure from the core.
    #[error(transparent)]
    Chat(#[from] ChatError),

    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Registration is closed on this instance")]
    RegistrationClosed,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Chat(ChatError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ServerError::Chat(ChatError::NotFound(_)) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Chat(ChatError::Conflict(_)) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::Chat(ChatError::Persistence(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ServerError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::RegistrationClosed => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServerError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn chat_errors_map_to_http_statuses() {
        assert_eq!(
            status_of(ChatError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ChatError::NotFound("gone".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ChatError::Conflict("taken".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ChatError::Persistence("io".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn credential_failures_are_unauthorized() {
        assert_eq!(
            status_of(ServerError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn persistence_details_are_not_leaked() {
        let response = ServerError::Chat(ChatError::Persistence("disk path /secret".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
