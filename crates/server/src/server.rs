use axum::{
    Router,
    routing::{get, post},
};

use std::sync::Arc;

use crate::{auth, budget, health};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/auth/demo", post(auth::demo_login))
        .route("/api/budget/sync", post(budget::push).get(budget::pull))
        .route("/api/budget/latest", get(budget::latest))
        .route("/api/health", get(health::get))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use engine::DEMO_USER_ID;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        router(ServerState {
            engine: Arc::new(Engine::builder().build()),
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn spawned_server_listens_on_the_given_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let bound = listener.local_addr().unwrap();
        let addr = spawn_with_listener(Engine::builder().build(), listener).unwrap();
        assert_eq!(addr, bound);

        let stream = tokio::net::TcpStream::connect(addr).await;
        assert!(stream.is_ok());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(&app(), get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "BudgetBox API");
        assert_eq!(body["endpoints"]["sync"], "/api/budget/sync");
    }

    #[tokio::test]
    async fn demo_login_accepts_only_the_demo_pair() {
        let app = app();
        let ok = json!({ "email": DEMO_USER_ID, "password": "HireMe@2025!" }).to_string();
        let (status, body) = send(&app, post_json("/api/auth/demo", &ok)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["token"], "demo-token-123456");
        assert_eq!(body["user"]["name"], "Demo User");

        let wrong = json!({ "email": DEMO_USER_ID, "password": "nope" }).to_string();
        let (status, body) = send(&app, post_json("/api/auth/demo", &wrong)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        let (status, body) = send(&app, post_json("/api/auth/demo", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email and password are required");
    }

    #[tokio::test]
    async fn push_coerces_non_numeric_income() {
        let app = app();
        let payload = json!({ "userId": "alice", "income": "abc" }).to_string();
        let (status, body) = send(&app, post_json("/api/budget/sync", &payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["budget"]["income"], 0.0);
        assert_eq!(body["budget"]["syncStatus"], "synced");
        assert_eq!(body["budget"]["categories"]["food"], 0.0);
        assert!(body["timestamp"].is_string());

        let (status, body) = send(&app, get("/api/budget/sync?userId=alice")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["budget"]["income"], 0.0);
    }

    #[tokio::test]
    async fn push_rejects_payloads_that_are_not_records() {
        let app = app();
        let (status, body) = send(&app, post_json("/api/budget/sync", "[1, 2]")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid budget data");

        let (status, body) = send(&app, post_json("/api/budget/sync", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn sync_get_is_not_found_before_any_push() {
        let (status, body) = send(&app(), get("/api/budget/sync")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn latest_provisions_only_the_demo_user() {
        let app = app();
        let (status, body) = send(&app, get("/api/budget/latest?userId=stranger")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let uri = format!("/api/budget/latest?userId={DEMO_USER_ID}");
        let (status, body) = send(&app, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["budget"]["income"], 50_000.0);
        assert_eq!(body["budget"]["categories"]["monthlyBills"], 15_000.0);

        // Without a userId the demo account is assumed.
        let (status, body) = send(&app, get("/api/budget/latest")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["budget"]["userId"], DEMO_USER_ID);
    }

    #[tokio::test]
    async fn pushed_budget_replaces_demo_default() {
        let app = app();
        let payload = json!({
            "id": "budget-1",
            "userId": DEMO_USER_ID,
            "income": 42_000,
            "categories": { "monthlyBills": 1, "food": 2, "transport": 3, "subscriptions": 4, "miscellaneous": 5 },
        })
        .to_string();
        let (status, _) = send(&app, post_json("/api/budget/sync", &payload)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get("/api/budget/latest")).await;
        assert_eq!(body["budget"]["income"], 42_000.0);
        assert_eq!(body["budget"]["categories"]["subscriptions"], 4.0);
    }
}
