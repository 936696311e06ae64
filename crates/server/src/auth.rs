//! Demo authentication endpoint

use api_types::auth::{DemoLogin, LoginResponse};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{ServerError, server::ServerState};

/// Check the posted pair against the demo credential
pub async fn demo_login(
    State(state): State<ServerState>,
    payload: Result<Json<DemoLogin>, JsonRejection>,
) -> Result<Json<LoginResponse>, ServerError> {
    let Json(payload) = payload.map_err(|err| ServerError::Generic(err.body_text()))?;
    let session = state
        .engine
        .authenticate(payload.email.as_deref(), payload.password.as_deref())?;

    tracing::info!(user_id = %session.user.id, "demo login");
    Ok(Json(LoginResponse {
        success: true,
        user: session.user,
        token: session.token,
    }))
}
