use api_types::health::{Health, HealthEndpoints};
use axum::Json;
use chrono::Utc;

pub const SERVICE_NAME: &str = "BudgetBox API";

pub async fn get() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        endpoints: HealthEndpoints {
            auth: "/api/auth/demo".to_string(),
            sync: "/api/budget/sync".to_string(),
            latest: "/api/budget/latest".to_string(),
            health: "/api/health".to_string(),
        },
    })
}
