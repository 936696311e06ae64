use api_types::error::ErrorResponse;
use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerState, router, run_with_listener, spawn_with_listener};

mod auth;
mod budget;
mod health;
mod server;

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), err.to_string()),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        if status.is_client_error() {
            tracing::debug!(%status, "request rejected: {error}");
        }

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
