use std::time::Duration;

use api_types::{
    auth::{DemoLogin, DemoUser, LoginResponse},
    budget::Budget,
    error::ErrorResponse,
};
use chrono::{DateTime, Utc};
use engine::{RecordDefaults, decode_record};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::error::{AppError, Result};

/// Upper bound for reachability probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

const UNAVAILABLE: &str = "Server unavailable";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not found")]
    NotFound,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Server(String),
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ClientError {
    /// Message shown to the user. Missing endpoints and transport failures
    /// both read as an unavailable server.
    fn reason(&self) -> String {
        match self {
            Self::NotFound | Self::Transport(_) => UNAVAILABLE.to_string(),
            Self::Unauthorized(msg) | Self::Validation(msg) | Self::Server(msg) => msg.clone(),
        }
    }

    /// The server never answered, or has no such endpoint.
    fn is_unreachable(&self) -> bool {
        matches!(self, Self::NotFound | Self::Transport(_))
    }
}

/// Result of a push. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Acknowledged {
        timestamp: DateTime<Utc>,
        budget: Option<Budget>,
    },
    /// The server answered but refused the record.
    Rejected {
        error: String,
    },
    /// No answer, or no sync endpoint.
    Unreachable {
        error: String,
    },
}

impl PushOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Acknowledged { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    LoggedIn { user: DemoUser, token: String },
    Failed { error: String },
}

/// Reachability of each sync-related endpoint, for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EndpointStatus {
    pub health: bool,
    pub auth: bool,
    pub sync: bool,
    pub latest: bool,
}

impl EndpointStatus {
    pub fn entries(&self) -> [(&'static str, bool); 4] {
        [
            ("health", self.health),
            ("auth", self.auth),
            ("sync", self.sync),
            ("latest", self.latest),
        ]
    }
}

#[derive(Debug, Deserialize)]
struct AckBody {
    #[serde(default)]
    success: bool,
    timestamp: Option<DateTime<Utc>>,
    budget: Option<Value>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BudgetBody {
    #[serde(default)]
    success: bool,
    budget: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
}

#[derive(Debug, Clone)]
pub struct SyncClient {
    base_url: Url,
    http: reqwest::Client,
}

impl SyncClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url =
            Url::parse(&base_url).map_err(|err| AppError::BaseUrl(err.to_string()))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Server(format!("invalid base_url: {err}")))
    }

    async fn send_json<T: DeserializeOwned>(
        request: RequestBuilder,
    ) -> std::result::Result<T, ClientError> {
        let res = request.send().await?;

        if res.status().is_success() {
            return Ok(res.json::<T>().await?);
        }

        let status = res.status();
        let body = res
            .json::<ErrorResponse>()
            .await
            .map(|err| err.error)
            .unwrap_or_else(|_| "unknown error".to_string());

        let err = match status.as_u16() {
            400 | 422 => ClientError::Validation(body),
            401 | 403 => ClientError::Unauthorized(body),
            404 => ClientError::NotFound,
            _ => ClientError::Server(body),
        };
        Err(err)
    }

    async fn post_budget(&self, budget: &Budget) -> std::result::Result<AckBody, ClientError> {
        let request = self.http.post(self.endpoint("api/budget/sync")?).json(budget);
        Self::send_json(request).await
    }

    async fn get_latest(&self, user_id: &str) -> std::result::Result<BudgetBody, ClientError> {
        let request = self
            .http
            .get(self.endpoint("api/budget/latest")?)
            .query(&[("userId", user_id)]);
        Self::send_json(request).await
    }

    async fn post_login(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<LoginResponse, ClientError> {
        let payload = DemoLogin {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let request = self.http.post(self.endpoint("api/auth/demo")?).json(&payload);
        Self::send_json(request).await
    }

    /// Upload the full record. The server's acknowledgment timestamp is
    /// returned on success.
    pub async fn push_budget(&self, budget: &Budget) -> PushOutcome {
        let body = match self.post_budget(budget).await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(budget_id = %budget.id, "push failed: {err}");
                let error = err.reason();
                return if err.is_unreachable() {
                    PushOutcome::Unreachable { error }
                } else {
                    PushOutcome::Rejected { error }
                };
            }
        };

        let Some(timestamp) = body.timestamp.filter(|_| body.success) else {
            return PushOutcome::Rejected {
                error: body.error.unwrap_or_else(|| "Sync failed".to_string()),
            };
        };

        let acknowledged = body.budget.and_then(|value| {
            decode_record(&value, &defaults_for(&budget.id, &budget.user_id), Utc::now()).ok()
        });
        tracing::info!(budget_id = %budget.id, %timestamp, "budget pushed");
        PushOutcome::Acknowledged {
            timestamp,
            budget: acknowledged,
        }
    }

    /// Download the stored record of `user_id`; `None` when the server has
    /// nothing for that user or cannot be reached.
    pub async fn pull_budget(&self, user_id: &str) -> Option<Budget> {
        let body = match self.get_latest(user_id).await {
            Ok(body) => body,
            Err(ClientError::NotFound) => {
                tracing::info!(user_id, "no budget on server");
                return None;
            }
            Err(err) => {
                tracing::warn!(user_id, "pull failed: {err}");
                return None;
            }
        };
        if !body.success {
            return None;
        }

        let defaults = defaults_for(engine::budget::DEFAULT_BUDGET_ID, user_id);
        match decode_record(&body.budget?, &defaults, Utc::now()) {
            Ok(budget) => Some(budget),
            Err(err) => {
                tracing::warn!(user_id, "server returned an unusable budget: {err}");
                None
            }
        }
    }

    /// Bounded reachability probe; any failure reads as unreachable.
    pub async fn check_health(&self) -> bool {
        let Ok(url) = self.endpoint("api/health") else {
            return false;
        };
        let request = self.http.get(url).timeout(PROBE_TIMEOUT);
        match Self::send_json::<HealthBody>(request).await {
            Ok(body) => body.status == "ok",
            Err(err) => {
                tracing::debug!("health check failed: {err}");
                false
            }
        }
    }

    /// Probe every endpoint concurrently. Payloads are chosen so that no
    /// probe changes server state.
    pub async fn check_endpoints(&self) -> EndpointStatus {
        let (health, auth, sync, latest) = tokio::join!(
            self.probe(self.endpoint("api/health").map(|url| self.http.get(url))),
            self.probe(
                self.endpoint("api/auth/demo")
                    .map(|url| self.http.post(url).json(&json!({})))
            ),
            self.probe(
                self.endpoint("api/budget/sync")
                    .map(|url| self.http.post(url).json(&json!([])))
            ),
            self.probe(
                self.endpoint("api/budget/latest")
                    .map(|url| self.http.get(url).query(&[("userId", "endpoint-probe")]))
            ),
        );

        EndpointStatus {
            health,
            auth,
            sync,
            latest,
        }
    }

    /// An endpoint is reachable when it answered, unless the answer is a
    /// bare 404/405 (no such route) or a server fault.
    async fn probe(&self, request: std::result::Result<RequestBuilder, ClientError>) -> bool {
        let Ok(request) = request else {
            return false;
        };
        let res = match request.timeout(PROBE_TIMEOUT).send().await {
            Ok(res) => res,
            Err(err) => {
                tracing::debug!("endpoint probe failed: {err}");
                return false;
            }
        };

        match res.status() {
            StatusCode::NOT_FOUND => res.json::<ErrorResponse>().await.is_ok(),
            StatusCode::METHOD_NOT_ALLOWED => false,
            status => !status.is_server_error(),
        }
    }

    pub async fn demo_login(&self, email: &str, password: &str) -> LoginOutcome {
        match self.post_login(email, password).await {
            Ok(body) if body.success => LoginOutcome::LoggedIn {
                user: body.user,
                token: body.token,
            },
            Ok(_) => LoginOutcome::Failed {
                error: "Login failed".to_string(),
            },
            Err(err) => {
                tracing::warn!("demo login failed: {err}");
                LoginOutcome::Failed { error: err.reason() }
            }
        }
    }
}

fn defaults_for(id: &str, user_id: &str) -> RecordDefaults {
    RecordDefaults {
        id: id.to_string(),
        user_id: user_id.to_string(),
    }
}
