//! Device-side budget state.
//!
//! Every income/category edit is written through to storage before the call
//! returns; nothing is batched.

use api_types::budget::{Budget, CategoryKey, SyncStatus};
use chrono::{DateTime, Utc};
use engine::{analytics::Summary, budget::clamp_amount, normalize_local, sanitize};
use serde_json::Value;

use crate::{error::AppError, storage::Storage};

/// Storage key of the persisted record.
pub const STORAGE_KEY: &str = "budget-storage";

#[derive(Debug)]
pub struct BudgetStore<S> {
    storage: S,
    budget: Option<Budget>,
    is_online: bool,
    last_saved: Option<DateTime<Utc>>,
}

impl<S: Storage> BudgetStore<S> {
    /// An empty store; call [`BudgetStore::load`] before editing.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            budget: None,
            is_online: true,
            last_saved: None,
        }
    }

    /// Construct and load in one step.
    pub fn open(storage: S) -> Self {
        let mut store = Self::new(storage);
        store.load();
        store
    }

    /// Read the persisted record, falling back to the built-in default when
    /// it is missing, malformed or unreadable.
    pub fn load(&mut self) {
        let raw = match self.storage.get(STORAGE_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("failed to read stored budget, using default: {err}");
                None
            }
        };
        let value = raw.and_then(|raw| match serde_json::from_str::<Value>(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("stored budget is not valid JSON, using default: {err}");
                None
            }
        });

        let budget = normalize_local(value.as_ref(), Utc::now());
        tracing::debug!(budget_id = %budget.id, status = %budget.sync_status, "budget loaded");
        self.budget = Some(budget);
    }

    /// Replace the whole record, e.g. after a pull.
    pub fn set_budget(&mut self, budget: Budget) {
        self.budget = Some(sanitize(budget));
        self.persist();
    }

    pub fn update_income(&mut self, amount: f64) {
        self.edit(|budget| budget.income = clamp_amount(amount));
    }

    pub fn update_category(&mut self, key: CategoryKey, amount: f64) {
        self.edit(|budget| budget.categories.set(key, clamp_amount(amount)));
    }

    pub fn set_online_status(&mut self, is_online: bool) {
        self.is_online = is_online;
    }

    /// Set the sync status; `Synced` also stamps `syncedAt`.
    pub fn set_sync_status(&mut self, status: SyncStatus) {
        let Some(budget) = self.budget.as_mut() else {
            return;
        };
        budget.sync_status = status;
        if status == SyncStatus::Synced {
            budget.synced_at = Some(Utc::now());
        }
        self.persist();
    }

    pub fn mark_saved(&mut self) {
        self.last_saved = Some(Utc::now());
    }

    pub fn budget(&self) -> Option<&Budget> {
        self.budget.as_ref()
    }

    pub fn is_online(&self) -> bool {
        self.is_online
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.budget
            .as_ref()
            .map(|budget| budget.sync_status)
            .unwrap_or_default()
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    pub fn summary(&self, day_of_month: u32) -> Option<Summary> {
        self.budget
            .as_ref()
            .map(|budget| Summary::of(budget, day_of_month))
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Apply a user edit: no-op without a record, otherwise the record goes
    /// `pending` and is written through.
    fn edit(&mut self, apply: impl FnOnce(&mut Budget)) {
        let Some(budget) = self.budget.as_mut() else {
            return;
        };
        apply(budget);
        budget.updated_at = Utc::now();
        budget.sync_status = SyncStatus::Pending;
        if self.persist() {
            self.mark_saved();
        }
    }

    /// Write the record through; `false` when storage refused it.
    fn persist(&self) -> bool {
        let Some(budget) = self.budget.as_ref() else {
            return false;
        };
        let result = serde_json::to_string(budget)
            .map_err(AppError::from)
            .and_then(|payload| self.storage.set(STORAGE_KEY, &payload));
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(budget_id = %budget.id, "failed to persist budget: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use engine::{DEMO_USER_ID, default_budget};
    use proptest::prelude::*;

    use super::*;
    use crate::{
        error::Result,
        storage::{MemoryStorage, NoopStorage},
    };

    fn persisted(storage: &MemoryStorage) -> Budget {
        let raw = storage.get(STORAGE_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    struct FailingStorage;

    impl Storage for FailingStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(AppError::Storage("disk on fire".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(AppError::Storage("disk on fire".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn empty_storage_loads_default_budget() {
        let store = BudgetStore::open(MemoryStorage::new());
        let budget = store.budget().unwrap();
        assert_eq!(budget.user_id, DEMO_USER_ID);
        assert_eq!(budget.income, 50_000.0);
        assert_eq!(store.sync_status(), SyncStatus::Local);
        assert!(store.last_saved().is_none());
    }

    #[test]
    fn malformed_storage_loads_default_budget() {
        let storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "{ definitely not json").unwrap();
        let store = BudgetStore::open(storage);
        assert_eq!(store.budget().unwrap().income, 50_000.0);
    }

    #[test]
    fn unreadable_storage_loads_default_budget() {
        let store = BudgetStore::open(FailingStorage);
        assert_eq!(store.budget().unwrap().total_expenses(), 33_000.0);
    }

    #[test]
    fn stored_record_is_normalized_on_load() {
        let storage = MemoryStorage::new();
        storage
            .set(
                STORAGE_KEY,
                r#"{"income": 900, "categories": {"food": "n/a", "transport": 12}}"#,
            )
            .unwrap();
        let store = BudgetStore::open(storage);
        let budget = store.budget().unwrap();
        assert_eq!(budget.income, 900.0);
        assert_eq!(budget.categories.food, 0.0);
        assert_eq!(budget.categories.transport, 12.0);
        assert_eq!(budget.sync_status, SyncStatus::Local);
    }

    #[test]
    fn edits_without_a_record_are_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = BudgetStore::new(Arc::clone(&storage));
        store.update_income(10.0);
        store.update_category(CategoryKey::Food, 10.0);
        store.set_sync_status(SyncStatus::Synced);

        assert!(store.budget().is_none());
        assert!(store.last_saved().is_none());
        assert_eq!(storage.get(STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn income_edit_goes_pending_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = BudgetStore::open(Arc::clone(&storage));
        let before = store.budget().unwrap().updated_at;

        store.update_income(61_000.0);

        let budget = store.budget().unwrap();
        assert_eq!(budget.income, 61_000.0);
        assert_eq!(budget.sync_status, SyncStatus::Pending);
        assert!(budget.updated_at >= before);
        assert!(store.last_saved().is_some());
        assert_eq!(&persisted(&storage), budget);
    }

    #[test]
    fn category_edit_targets_one_field() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = BudgetStore::open(Arc::clone(&storage));

        store.update_category(CategoryKey::Subscriptions, 450.0);

        let budget = store.budget().unwrap();
        assert_eq!(budget.categories.subscriptions, 450.0);
        assert_eq!(budget.categories.food, 8_000.0);
        assert_eq!(persisted(&storage).categories.subscriptions, 450.0);
    }

    #[test]
    fn negative_amounts_are_stored_as_zero() {
        let mut store = BudgetStore::open(MemoryStorage::new());
        store.update_income(-1.0);
        store.update_category(CategoryKey::Food, f64::NAN);
        let budget = store.budget().unwrap();
        assert_eq!(budget.income, 0.0);
        assert_eq!(budget.categories.food, 0.0);
    }

    #[test]
    fn only_set_sync_status_marks_synced() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = BudgetStore::open(Arc::clone(&storage));
        store.update_income(1.0);
        assert!(store.budget().unwrap().synced_at.is_none());

        store.set_sync_status(SyncStatus::Synced);
        assert_eq!(store.sync_status(), SyncStatus::Synced);
        assert!(store.budget().unwrap().synced_at.is_some());
        assert_eq!(persisted(&storage).sync_status, SyncStatus::Synced);

        store.update_category(CategoryKey::Food, 2.0);
        assert_eq!(store.sync_status(), SyncStatus::Pending);

        // Going pending keeps the last acknowledgment.
        store.set_sync_status(SyncStatus::Pending);
        assert!(store.budget().unwrap().synced_at.is_some());
    }

    #[test]
    fn set_budget_sanitizes_and_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = BudgetStore::new(Arc::clone(&storage));
        let mut budget = default_budget(Utc::now());
        budget.categories.transport = -3.0;

        store.set_budget(budget);

        assert_eq!(store.budget().unwrap().categories.transport, 0.0);
        assert_eq!(persisted(&storage).categories.transport, 0.0);
    }

    #[test]
    fn write_failures_do_not_lose_the_edit_in_memory() {
        let mut store = BudgetStore::new(FailingStorage);
        store.set_budget(default_budget(Utc::now()));
        store.update_income(7.0);
        assert_eq!(store.budget().unwrap().income, 7.0);
        assert_eq!(store.sync_status(), SyncStatus::Pending);
    }

    #[test]
    fn failed_write_is_not_reported_as_saved() {
        let mut store = BudgetStore::open(FailingStorage);
        store.update_income(1.0);
        store.update_category(CategoryKey::Food, 2.0);
        assert!(store.last_saved().is_none());
    }

    #[test]
    fn successful_write_is_reported_as_saved() {
        let mut store = BudgetStore::open(MemoryStorage::new());
        store.update_income(1.0);
        assert!(store.last_saved().is_some());
    }

    #[test]
    fn online_flag_is_in_memory_only() {
        let mut store = BudgetStore::open(NoopStorage);
        assert!(store.is_online());
        store.set_online_status(false);
        assert!(!store.is_online());
    }

    #[test]
    fn summary_follows_edits() {
        let mut store = BudgetStore::open(MemoryStorage::new());
        assert_eq!(store.summary(1).unwrap().savings, 17_000.0);
        store.update_category(CategoryKey::Food, 0.0);
        assert_eq!(store.summary(1).unwrap().savings, 25_000.0);
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Income(f64),
        Category(CategoryKey, f64),
    }

    fn edit_strategy() -> impl Strategy<Value = Edit> {
        let key = prop::sample::select(CategoryKey::ALL.to_vec());
        prop_oneof![
            (0.0..1_000_000.0f64).prop_map(Edit::Income),
            (key, 0.0..1_000_000.0f64).prop_map(|(key, amount)| Edit::Category(key, amount)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn persisted_record_always_equals_memory(edits in prop::collection::vec(edit_strategy(), 1..30)) {
            let storage = Arc::new(MemoryStorage::new());
            let mut store = BudgetStore::open(Arc::clone(&storage));

            for edit in edits {
                match edit {
                    Edit::Income(amount) => store.update_income(amount),
                    Edit::Category(key, amount) => store.update_category(key, amount),
                }
                prop_assert_eq!(&persisted(&storage), store.budget().unwrap());
                prop_assert_eq!(store.sync_status(), SyncStatus::Pending);
            }

            // A fresh store over the same storage sees the same record.
            let reopened = BudgetStore::open(Arc::clone(&storage));
            prop_assert_eq!(reopened.budget(), store.budget());
        }
    }
}
