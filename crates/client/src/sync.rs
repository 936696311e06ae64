//! Push/pull orchestration between the device store and the server.
//!
//! A session tracks what the user sees next to the sync button: server
//! reachability, per-endpoint diagnostics, the last error and the last
//! successful sync. Sessions that share an [`InFlight`] registry never run
//! two operations for the same user at once.

use std::{
    collections::HashSet,
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use api_types::budget::{Budget, SyncStatus};
use chrono::{DateTime, Utc};
use engine::DEMO_USER_ID;
use serde::{Deserialize, Serialize};

use crate::{
    client::{EndpointStatus, PushOutcome, SyncClient},
    storage::Storage,
    store::BudgetStore,
};

/// How often the presentation layer should refresh reachability.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// What a pull does when the device has unsynced edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullPolicy {
    /// Refuse to pull while the local record is `pending`.
    #[default]
    KeepLocal,
    /// Always replace the local record with the server copy.
    PreferServer,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pull policy \"{0}\", expected keep_local or prefer_server")]
pub struct UnknownPolicy(pub String);

impl FromStr for PullPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('-', "_").as_str() {
            "keep_local" => Ok(Self::KeepLocal),
            "prefer_server" => Ok(Self::PreferServer),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerStatus {
    #[default]
    Checking,
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("a sync for \"{0}\" is already in progress")]
    Busy(String),
    #[error("no budget to sync")]
    NoBudget,
    #[error("device is offline")]
    Offline,
    #[error("local changes are pending, sync them before pulling")]
    PendingChanges,
    #[error("No data received from server")]
    NoData,
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Unreachable(String),
}

/// Users with a sync operation in flight.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    users: Arc<Mutex<HashSet<String>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `user_id`; `None` when another operation holds it.
    pub fn try_acquire(&self, user_id: &str) -> Option<InFlightGuard> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if !users.insert(user_id.to_string()) {
            return None;
        }
        Some(InFlightGuard {
            users: Arc::clone(&self.users),
            user_id: user_id.to_string(),
        })
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user_id)
    }
}

/// Releases the user on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    users: Arc<Mutex<HashSet<String>>>,
    user_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.user_id);
    }
}

#[derive(Debug)]
pub struct SyncSession {
    client: SyncClient,
    in_flight: InFlight,
    policy: PullPolicy,
    server_status: ServerStatus,
    endpoints: Option<EndpointStatus>,
    sync_error: Option<String>,
    last_sync_time: Option<DateTime<Utc>>,
}

impl SyncSession {
    pub fn new(client: SyncClient, in_flight: InFlight, policy: PullPolicy) -> Self {
        Self {
            client,
            in_flight,
            policy,
            server_status: ServerStatus::Checking,
            endpoints: None,
            sync_error: None,
            last_sync_time: None,
        }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    pub fn server_status(&self) -> ServerStatus {
        self.server_status
    }

    pub fn endpoints(&self) -> Option<EndpointStatus> {
        self.endpoints
    }

    pub fn sync_error(&self) -> Option<&str> {
        self.sync_error.as_deref()
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync_time
    }

    pub fn is_syncing(&self, user_id: &str) -> bool {
        self.in_flight.contains(user_id)
    }

    /// Probe health, and the individual endpoints when healthy.
    pub async fn refresh_status(&mut self) -> ServerStatus {
        self.server_status = ServerStatus::Checking;
        let healthy = self.client.check_health().await;
        self.server_status = if healthy {
            self.endpoints = Some(self.client.check_endpoints().await);
            ServerStatus::Online
        } else {
            ServerStatus::Offline
        };
        tracing::debug!(status = ?self.server_status, "server status refreshed");
        self.server_status
    }

    /// Advisory: a push may still fail after this returns `true`.
    pub fn can_sync<S: Storage>(&self, store: &BudgetStore<S>) -> bool {
        store.is_online()
            && store.budget().is_some()
            && self.server_status == ServerStatus::Online
            && self.endpoints.is_none_or(|endpoints| endpoints.sync)
    }

    /// Push the local record. On success the record is `synced` with the
    /// server's timestamp; on failure it goes back to `pending`.
    pub async fn sync<S: Storage>(
        &mut self,
        store: &mut BudgetStore<S>,
    ) -> Result<DateTime<Utc>, SyncError> {
        if !store.is_online() {
            return Err(SyncError::Offline);
        }
        let budget = store.budget().cloned().ok_or(SyncError::NoBudget)?;
        let _guard = self
            .in_flight
            .try_acquire(&budget.user_id)
            .ok_or_else(|| SyncError::Busy(budget.user_id.clone()))?;

        self.sync_error = None;
        match self.client.push_budget(&budget).await {
            PushOutcome::Acknowledged { timestamp, .. } => {
                store.set_budget(Budget {
                    synced_at: Some(timestamp),
                    sync_status: SyncStatus::Synced,
                    ..budget
                });
                self.last_sync_time = Some(Utc::now());
                self.server_status = ServerStatus::Online;
                Ok(timestamp)
            }
            PushOutcome::Rejected { error } => {
                self.sync_error = Some(error.clone());
                store.set_sync_status(SyncStatus::Pending);
                self.server_status = ServerStatus::Online;
                Err(SyncError::Rejected(error))
            }
            PushOutcome::Unreachable { error } => {
                self.sync_error = Some(error.clone());
                store.set_sync_status(SyncStatus::Pending);
                self.server_status = ServerStatus::Offline;
                Err(SyncError::Unreachable(error))
            }
        }
    }

    /// Replace the local record with the server copy, subject to the pull
    /// policy.
    pub async fn pull<S: Storage>(
        &mut self,
        store: &mut BudgetStore<S>,
    ) -> Result<Budget, SyncError> {
        if !store.is_online() {
            return Err(SyncError::Offline);
        }
        if self.policy == PullPolicy::KeepLocal && store.sync_status() == SyncStatus::Pending {
            let err = SyncError::PendingChanges;
            self.sync_error = Some(err.to_string());
            return Err(err);
        }

        let user_id = store
            .budget()
            .map(|budget| budget.user_id.clone())
            .unwrap_or_else(|| DEMO_USER_ID.to_string());
        let _guard = self
            .in_flight
            .try_acquire(&user_id)
            .ok_or_else(|| SyncError::Busy(user_id.clone()))?;

        self.sync_error = None;
        let Some(latest) = self.client.pull_budget(&user_id).await else {
            let err = SyncError::NoData;
            self.sync_error = Some(err.to_string());
            return Err(err);
        };

        if store.sync_status() == SyncStatus::Pending {
            tracing::warn!(user_id, "pull overwrote pending local changes");
        }
        store.set_budget(latest);
        store.set_sync_status(SyncStatus::Synced);
        self.last_sync_time = Some(Utc::now());
        self.server_status = ServerStatus::Online;

        store.budget().cloned().ok_or(SyncError::NoBudget)
    }

    /// One-line status help, in order of precedence.
    pub fn hint<S: Storage>(&self, store: &BudgetStore<S>) -> &'static str {
        if !store.is_online() {
            return "Offline - changes saved locally";
        }
        if self.server_status == ServerStatus::Offline {
            return "Server unavailable - working offline";
        }
        if self.endpoints.is_some_and(|endpoints| !endpoints.sync) {
            return "Sync endpoint missing - API incomplete";
        }
        match store.sync_status() {
            SyncStatus::Pending => "You have unsynced changes. Push them to save to the server.",
            SyncStatus::Synced => "All changes are synced with the server.",
            SyncStatus::Local => {
                "This budget exists only on this device. Sync to access it from other devices."
            }
        }
    }
}
