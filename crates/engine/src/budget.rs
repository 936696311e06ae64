//! Built-in defaults shared by the device store and the server store.

use api_types::budget::{Budget, Categories, SyncStatus};
use chrono::{DateTime, Utc};

/// The only account supported end to end.
pub const DEMO_USER_ID: &str = "hire-me@anshumat.org";
pub const DEFAULT_BUDGET_ID: &str = "budget-1";
pub const DEFAULT_INCOME: f64 = 50_000.0;
pub const DEFAULT_CATEGORIES: Categories = Categories {
    monthly_bills: 15_000.0,
    food: 8_000.0,
    transport: 5_000.0,
    subscriptions: 2_000.0,
    miscellaneous: 3_000.0,
};

/// Budget substituted when nothing usable is persisted.
pub fn default_budget(now: DateTime<Utc>) -> Budget {
    Budget {
        id: DEFAULT_BUDGET_ID.to_string(),
        user_id: DEMO_USER_ID.to_string(),
        income: DEFAULT_INCOME,
        categories: DEFAULT_CATEGORIES,
        created_at: now,
        updated_at: now,
        synced_at: None,
        sync_status: SyncStatus::Local,
    }
}

pub fn is_demo_user(user_id: &str) -> bool {
    user_id == DEMO_USER_ID
}

/// Fresh id for records pushed without one.
pub fn generate_budget_id() -> String {
    format!("budget-{}", uuid::Uuid::new_v4())
}

/// Amounts must be finite and non-negative, anything else is stored as 0.
pub fn clamp_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount >= 0.0 {
        amount
    } else {
        0.0
    }
}

/// Re-applies the amount rule to an already typed record.
pub fn sanitize(mut budget: Budget) -> Budget {
    budget.income = clamp_amount(budget.income);
    let categories = budget.categories;
    for (key, amount) in categories.iter() {
        budget.categories.set(key, clamp_amount(amount));
    }
    budget
}
