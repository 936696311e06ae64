//! Derived figures for the dashboard: totals, burn rate, month-end
//! projection and the rule-based anomalies and suggestions.

use api_types::budget::{Budget, CategoryKey};
use serde::Serialize;

/// Months are projected over a fixed length.
pub const DAYS_IN_MONTH: u32 = 30;

const FOOD_SHARE_LIMIT: f64 = 0.4;
const SUBSCRIPTIONS_SHARE_LIMIT: f64 = 0.3;
const HEALTHY_SAVINGS_RATE: f64 = 0.2;
const LOW_TRANSPORT_SHARE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub income: f64,
    pub total_expenses: f64,
    /// Income minus expenses, negative when over budget.
    pub savings: f64,
    /// Expenses as a percentage of income, 0 without income.
    pub burn_rate: f64,
    pub daily_spend_rate: f64,
    pub month_end_projection: f64,
}

impl Summary {
    /// `day_of_month` is clamped to `1..=31`.
    pub fn of(budget: &Budget, day_of_month: u32) -> Self {
        let total_expenses = budget.total_expenses();
        let savings = budget.income - total_expenses;
        let burn_rate = if budget.income > 0.0 {
            total_expenses / budget.income * 100.0
        } else {
            0.0
        };
        let day = f64::from(day_of_month.clamp(1, 31));
        let daily_spend_rate = total_expenses / day;

        Self {
            income: budget.income,
            total_expenses,
            savings,
            burn_rate,
            daily_spend_rate,
            month_end_projection: daily_spend_rate * f64::from(DAYS_IN_MONTH),
        }
    }

    pub fn over_budget(&self) -> bool {
        self.burn_rate > 100.0
    }
}

/// Share of each non-empty category in total expenses.
pub fn category_shares(budget: &Budget) -> Vec<(CategoryKey, f64)> {
    let total = budget.total_expenses();
    if total <= 0.0 {
        return Vec::new();
    }
    budget
        .categories
        .iter()
        .filter(|(_, amount)| *amount > 0.0)
        .map(|(key, amount)| (key, amount / total))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Warning,
    Alert,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: Severity,
    /// Category key, or `overall`.
    pub category: &'static str,
    pub message: &'static str,
}

pub fn anomalies(budget: &Budget) -> Vec<Anomaly> {
    let summary = Summary::of(budget, 1);
    let mut found = Vec::new();

    if share(budget, CategoryKey::Food).is_some_and(|s| s > FOOD_SHARE_LIMIT) {
        found.push(Anomaly {
            kind: AnomalyKind::Warning,
            severity: Severity::High,
            category: CategoryKey::Food.as_str(),
            message: "Food spending exceeds 40% of income",
        });
    }
    if share(budget, CategoryKey::Subscriptions).is_some_and(|s| s > SUBSCRIPTIONS_SHARE_LIMIT) {
        found.push(Anomaly {
            kind: AnomalyKind::Alert,
            severity: Severity::Medium,
            category: CategoryKey::Subscriptions.as_str(),
            message: "Subscriptions are 30% of your income",
        });
    }
    if summary.savings < 0.0 {
        found.push(Anomaly {
            kind: AnomalyKind::Critical,
            severity: Severity::Critical,
            category: "overall",
            message: "Expenses exceed income this month",
        });
    }
    if summary.over_budget() {
        found.push(Anomaly {
            kind: AnomalyKind::Critical,
            severity: Severity::Critical,
            category: "overall",
            message: "Burn rate exceeds 100%",
        });
    }

    found
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
    pub action: String,
}

impl Suggestion {
    fn new(title: &str, description: impl Into<String>, action: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            action: action.to_string(),
        }
    }
}

/// Rule-based suggestions, never empty.
pub fn suggestions(budget: &Budget) -> Vec<Suggestion> {
    let summary = Summary::of(budget, 1);
    let mut rules = Vec::new();

    if share(budget, CategoryKey::Food).is_some_and(|s| s > FOOD_SHARE_LIMIT) {
        rules.push(Suggestion::new(
            "Reduce Food Spending",
            "Food exceeds 40% of income. Consider meal planning and cooking at home.",
            "Try meal prep to save 2000-3000 this month.",
        ));
    }
    if share(budget, CategoryKey::Subscriptions).is_some_and(|s| s > SUBSCRIPTIONS_SHARE_LIMIT) {
        rules.push(Suggestion::new(
            "Review Subscriptions",
            "Subscriptions are 30% of income. Cancel unused services.",
            "Audit your subscriptions and cancel at least 2.",
        ));
    }
    if summary.savings < 0.0 {
        rules.push(Suggestion::new(
            "Expenses Exceed Income",
            "You're spending more than you earn this month.",
            "Review your highest expense categories and reduce by 20%.",
        ));
    }
    if budget.income > 0.0
        && summary.savings > 0.0
        && summary.savings / budget.income > HEALTHY_SAVINGS_RATE
    {
        rules.push(Suggestion::new(
            "Great Savings Rate!",
            format!(
                "You're saving {:.0} ({:.1}% of income).",
                summary.savings,
                summary.savings / budget.income * 100.0
            ),
            "Consider investing 50% of your savings for better returns.",
        ));
    }
    if share(budget, CategoryKey::Transport).is_some_and(|s| s < LOW_TRANSPORT_SHARE) {
        rules.push(Suggestion::new(
            "Efficient Transport",
            "Transport costs are below 10% of income - great job!",
            "Maintain this by using public transport or carpooling.",
        ));
    }

    if rules.is_empty() {
        rules.push(Suggestion::new(
            "Budget On Track",
            "Your budget looks healthy. Keep tracking your expenses.",
            "Consider setting aside 5000 for emergency fund this month.",
        ));
    }

    rules
}

/// Category amount over income, `None` without income.
fn share(budget: &Budget, key: CategoryKey) -> Option<f64> {
    (budget.income > 0.0).then(|| budget.categories.get(key) / budget.income)
}
