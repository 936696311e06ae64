use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod budget {
    use super::*;

    use std::{fmt, str::FromStr};

    /// Reconciliation state between the device copy and the server copy.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SyncStatus {
        /// No server-confirmed copy exists.
        #[default]
        Local,
        /// Mutated locally since the last acknowledgment.
        Pending,
        /// Matches the last server acknowledgment.
        Synced,
    }

    impl SyncStatus {
        pub fn as_str(self) -> &'static str {
            match self {
                Self::Local => "local",
                Self::Pending => "pending",
                Self::Synced => "synced",
            }
        }

        /// Parses the wire name, `None` for anything else.
        pub fn from_wire(value: &str) -> Option<Self> {
            match value {
                "local" => Some(Self::Local),
                "pending" => Some(Self::Pending),
                "synced" => Some(Self::Synced),
                _ => None,
            }
        }
    }

    impl fmt::Display for SyncStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    }

    /// One of the five fixed expense categories.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub enum CategoryKey {
        MonthlyBills,
        Food,
        Transport,
        Subscriptions,
        Miscellaneous,
    }

    impl CategoryKey {
        pub const ALL: [CategoryKey; 5] = [
            Self::MonthlyBills,
            Self::Food,
            Self::Transport,
            Self::Subscriptions,
            Self::Miscellaneous,
        ];

        /// Field name used in the JSON record.
        pub fn as_str(self) -> &'static str {
            match self {
                Self::MonthlyBills => "monthlyBills",
                Self::Food => "food",
                Self::Transport => "transport",
                Self::Subscriptions => "subscriptions",
                Self::Miscellaneous => "miscellaneous",
            }
        }

        /// Short human label.
        pub fn label(self) -> &'static str {
            match self {
                Self::MonthlyBills => "Bills",
                Self::Food => "Food",
                Self::Transport => "Transport",
                Self::Subscriptions => "Subscriptions",
                Self::Miscellaneous => "Misc",
            }
        }
    }

    #[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
    #[error("unknown category \"{0}\"")]
    pub struct UnknownCategory(pub String);

    impl FromStr for CategoryKey {
        type Err = UnknownCategory;

        /// Accepts the wire name (`monthlyBills`) or its kebab/snake spelling.
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let normalized: String = s
                .trim()
                .chars()
                .filter(|c| *c != '-' && *c != '_')
                .flat_map(char::to_lowercase)
                .collect();
            Self::ALL
                .into_iter()
                .find(|key| key.as_str().to_lowercase() == normalized)
                .ok_or_else(|| UnknownCategory(s.to_string()))
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Categories {
        pub monthly_bills: f64,
        pub food: f64,
        pub transport: f64,
        pub subscriptions: f64,
        pub miscellaneous: f64,
    }

    impl Categories {
        pub fn get(&self, key: CategoryKey) -> f64 {
            match key {
                CategoryKey::MonthlyBills => self.monthly_bills,
                CategoryKey::Food => self.food,
                CategoryKey::Transport => self.transport,
                CategoryKey::Subscriptions => self.subscriptions,
                CategoryKey::Miscellaneous => self.miscellaneous,
            }
        }

        pub fn set(&mut self, key: CategoryKey, amount: f64) {
            let slot = match key {
                CategoryKey::MonthlyBills => &mut self.monthly_bills,
                CategoryKey::Food => &mut self.food,
                CategoryKey::Transport => &mut self.transport,
                CategoryKey::Subscriptions => &mut self.subscriptions,
                CategoryKey::Miscellaneous => &mut self.miscellaneous,
            };
            *slot = amount;
        }

        pub fn iter(&self) -> impl Iterator<Item = (CategoryKey, f64)> + '_ {
            CategoryKey::ALL.into_iter().map(|key| (key, self.get(key)))
        }

        pub fn total(&self) -> f64 {
            self.iter().map(|(_, amount)| amount).sum()
        }
    }

    /// The single per-user budget: monthly income, five expense categories
    /// and sync metadata.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Budget {
        pub id: String,
        pub user_id: String,
        pub income: f64,
        pub categories: Categories,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        /// Last server acknowledgment, absent until the first successful sync.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub synced_at: Option<DateTime<Utc>>,
        #[serde(default)]
        pub sync_status: SyncStatus,
    }

    impl Budget {
        pub fn total_expenses(&self) -> f64 {
            self.categories.total()
        }
    }
}

pub mod auth {
    use super::*;

    /// Request body for `POST /api/auth/demo`.
    ///
    /// Both fields are optional so a missing field is reported as a bad
    /// request instead of a body rejection.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DemoLogin {
        pub email: Option<String>,
        pub password: Option<String>,
    }

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DemoUser {
        pub id: String,
        pub email: String,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub success: bool,
        pub user: DemoUser,
        pub token: String,
    }
}

pub mod sync {
    use super::*;
    use crate::budget::Budget;

    /// Query string of the pull endpoints.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserQuery {
        #[serde(rename = "userId")]
        pub user_id: Option<String>,
    }

    /// Acknowledgment of a push.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SyncAck {
        pub success: bool,
        pub timestamp: DateTime<Utc>,
        pub budget: Budget,
    }

    /// Body of both pull endpoints.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetResponse {
        pub success: bool,
        pub budget: Budget,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub timestamp: Option<DateTime<Utc>>,
    }
}

pub mod health {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HealthEndpoints {
        pub auth: String,
        pub sync: String,
        pub latest: String,
        pub health: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Health {
        pub status: String,
        pub timestamp: DateTime<Utc>,
        pub service: String,
        pub version: String,
        pub endpoints: HealthEndpoints,
    }
}

pub mod error {
    use super::*;

    /// Body of every non-2xx response.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ErrorResponse {
        pub error: String,
    }
}
