use api_types::budget::{Budget, SyncStatus};
use chrono::Utc;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

pub use auth::{DemoCredential, Session};
pub use budget::{DEMO_USER_ID, default_budget, is_demo_user, sanitize};
pub use decode::{RecordDefaults, decode_record, normalize_local};
pub use error::EngineError;

pub mod analytics;
pub mod auth;
pub mod budget;
pub mod decode;
mod error;

type ResultEngine<T> = Result<T, EngineError>;

/// Volatile server-side store: one budget per user id, last write wins.
///
/// Nothing survives a restart.
#[derive(Debug)]
pub struct Engine {
    budgets: RwLock<HashMap<String, Budget>>,
    credential: DemoCredential,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Normalize a pushed payload and store it under its `userId`,
    /// replacing whatever was there.
    ///
    /// The server clock stamps `updatedAt` and `syncedAt` while the write
    /// lock is held, so the stored record is always the one with the latest
    /// stamp.
    pub fn push_budget(&self, payload: &Value) -> ResultEngine<Budget> {
        let mut budget = decode_record(payload, &RecordDefaults::server(), Utc::now())?;

        let mut budgets = self.budgets.write().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        budget.updated_at = now;
        budget.synced_at = Some(now);
        budget.sync_status = SyncStatus::Synced;
        budgets.insert(budget.user_id.clone(), budget.clone());

        tracing::info!(user_id = %budget.user_id, budget_id = %budget.id, "budget synced");
        Ok(budget)
    }

    /// Return the stored budget of `user_id`.
    pub fn budget(&self, user_id: &str) -> ResultEngine<Budget> {
        self.budgets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
            .ok_or_else(|| EngineError::KeyNotFound(user_id.to_string()))
    }

    /// Like [`Engine::budget`], but the demo account gets the built-in
    /// default on first access instead of a not-found.
    pub fn latest_budget(&self, user_id: &str) -> ResultEngine<Budget> {
        match self.budget(user_id) {
            Err(EngineError::KeyNotFound(_)) if is_demo_user(user_id) => {}
            other => return other,
        }

        let mut budgets = self.budgets.write().unwrap_or_else(PoisonError::into_inner);
        let budget = budgets.entry(user_id.to_string()).or_insert_with(|| {
            tracing::info!(user_id, "materializing default budget");
            let now = Utc::now();
            let mut budget = default_budget(now);
            budget.synced_at = Some(now);
            budget.sync_status = SyncStatus::Synced;
            budget
        });
        Ok(budget.clone())
    }

    /// Check a login against the demo credential.
    pub fn authenticate(&self, email: Option<&str>, password: Option<&str>) -> ResultEngine<Session> {
        self.credential.verify(email, password)
    }
}

#[derive(Debug, Default)]
pub struct EngineBuilder {
    credential: DemoCredential,
    budgets: Vec<Budget>,
}

impl EngineBuilder {
    /// Replace the demo credential.
    pub fn credential(mut self, credential: DemoCredential) -> EngineBuilder {
        self.credential = credential;
        self
    }

    /// Seed a stored budget.
    pub fn budget(mut self, budget: Budget) -> EngineBuilder {
        self.budgets.push(budget);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        let budgets = self
            .budgets
            .into_iter()
            .map(|budget| (budget.user_id.clone(), budget))
            .collect();

        Engine {
            budgets: RwLock::new(budgets),
            credential: self.credential,
        }
    }
}
