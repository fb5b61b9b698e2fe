//! JSON error responses shared by the API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use supporthub_core::{AuditError, AuthError, TicketError, TransitionError};

/// Error body returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable reason for refused actions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub kind: Option<&'static str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            kind: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                kind: self.kind,
            }),
        )
            .into_response()
    }
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        let message = err.to_string();
        match err {
            TicketError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, message),
            TicketError::Unauthorized(AuthError::UnknownActor(_)) => {
                Self::new(StatusCode::NOT_FOUND, message).with_kind("unknown_actor")
            }
            TicketError::Unauthorized(AuthError::InvalidCredentials(_)) => {
                Self::new(StatusCode::FORBIDDEN, message).with_kind("invalid_credentials")
            }
            TicketError::Unauthorized(AuthError::ConfigurationError(_)) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
            TicketError::Transition(ref transition) => {
                let status = match transition {
                    TransitionError::InvalidStateTransition { .. }
                    | TransitionError::OwnershipConflict { .. } => StatusCode::CONFLICT,
                    TransitionError::Validation { .. } => StatusCode::BAD_REQUEST,
                };
                Self::new(status, message).with_kind(transition.kind())
            }
            TicketError::InvalidRequest(_) => Self::bad_request(message),
            TicketError::Database(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, message),
        }
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to query audit events: {}", err),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use supporthub_core::{TicketAction, TicketStatus};

    #[test]
    fn test_auth_errors_map_to_404_and_403() {
        let unknown: ApiError = TicketError::from(AuthError::UnknownActor("zoe".into())).into();
        assert_eq!(unknown.status, StatusCode::NOT_FOUND);
        assert_eq!(unknown.kind, Some("unknown_actor"));

        let wrong: ApiError =
            TicketError::from(AuthError::InvalidCredentials("alice".into())).into();
        assert_eq!(wrong.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_transition_errors_map_by_kind() {
        let invalid: ApiError = TicketError::from(TransitionError::InvalidStateTransition {
            action: TicketAction::Done,
            status: TicketStatus::Pending,
        })
        .into();
        assert_eq!(invalid.status, StatusCode::CONFLICT);
        assert_eq!(invalid.kind, Some("invalid_state"));

        let conflict: ApiError = TicketError::from(TransitionError::OwnershipConflict {
            holder: "alice".into(),
            actor: "bob".into(),
        })
        .into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);
        assert_eq!(conflict.kind, Some("ownership_conflict"));

        let missing: ApiError =
            TicketError::from(TransitionError::Validation { field: "reason" }).into();
        assert_eq!(missing.status, StatusCode::BAD_REQUEST);
        assert_eq!(missing.message, "Missing required field: reason");
    }

    #[test]
    fn test_not_found_and_database() {
        let missing: ApiError = TicketError::NotFound("t-1".into()).into();
        assert_eq!(missing.status, StatusCode::NOT_FOUND);
        assert_eq!(missing.kind, None);

        let db: ApiError = TicketError::Database("locked".into()).into();
        assert_eq!(db.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
