use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use yol_core::CoreError;
use yol_store::StoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Rejected(CoreError),
    NotFoundError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::AuthenticationError(_) => "unauthenticated",
            AppError::NotFoundError(_) => "not_found",
            AppError::Anyhow(_) => "internal",
            AppError::Rejected(err) => match err {
                CoreError::InvalidTransition { .. } => "invalid_transition",
                CoreError::SeatUnavailable { .. } => "seat_unavailable",
                CoreError::Unauthorized(_) => "unauthorized",
                CoreError::TripLocked => "trip_locked",
                CoreError::UnknownStatus(_)
                | CoreError::SeatNotFound(_)
                | CoreError::MalformedSnapshot(_)
                | CoreError::Validation(_) => "validation",
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Rejected(err) => {
                let status = match err {
                    CoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
                    CoreError::InvalidTransition { .. }
                    | CoreError::SeatUnavailable { .. }
                    | CoreError::TripLocked => StatusCode::CONFLICT,
                    _ => StatusCode::BAD_REQUEST,
                };
                (status, err.to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Rejected(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => AppError::NotFoundError(format!("Trip not found: {id}")),
            StoreError::Rejected(err) => AppError::Rejected(err),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Anyhow(err)
    }
}
