//! Budget sync API endpoints

use api_types::sync::{BudgetResponse, SyncAck, UserQuery};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
};
use chrono::Utc;
use engine::DEMO_USER_ID;
use serde_json::Value;

use crate::{ServerError, server::ServerState};

/// The pull endpoints fall back to the demo account without a `userId`.
fn requested_user(query: UserQuery) -> String {
    query
        .user_id
        .filter(|user_id| !user_id.trim().is_empty())
        .unwrap_or_else(|| DEMO_USER_ID.to_string())
}

/// Handle pushes of a (possibly partial) budget
pub async fn push(
    State(state): State<ServerState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SyncAck>, ServerError> {
    let Json(payload) = payload.map_err(|err| ServerError::Generic(err.body_text()))?;
    let budget = state.engine.push_budget(&payload)?;

    Ok(Json(SyncAck {
        success: true,
        timestamp: budget.synced_at.unwrap_or(budget.updated_at),
        budget,
    }))
}

/// Handle requests for the stored budget of a user
pub async fn pull(
    State(state): State<ServerState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<BudgetResponse>, ServerError> {
    let budget = state.engine.budget(&requested_user(query))?;

    Ok(Json(BudgetResponse {
        success: true,
        budget,
        timestamp: None,
    }))
}

/// Handle requests for the latest budget, provisioning the demo account
pub async fn latest(
    State(state): State<ServerState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<BudgetResponse>, ServerError> {
    let budget = state.engine.latest_budget(&requested_user(query))?;

    Ok(Json(BudgetResponse {
        success: true,
        budget,
        timestamp: Some(Utc::now()),
    }))
}
