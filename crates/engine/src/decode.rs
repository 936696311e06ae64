//! Decoding of untyped budget payloads.
//!
//! Every boundary (device load, server push, client pull) hands raw JSON to
//! this module and gets back either a fully populated [`Budget`] or a
//! validation error. Amounts that are not well-formed numbers become 0,
//! they are never rejected.

use api_types::budget::{Budget, Categories, CategoryKey, SyncStatus};
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{
    EngineError,
    budget::{DEFAULT_BUDGET_ID, DEMO_USER_ID, clamp_amount, default_budget, generate_budget_id},
};

/// Top-level fields of a record. An object carrying none of them is
/// treated as absent input.
const RECORD_FIELDS: [&str; 8] = [
    "id",
    "userId",
    "income",
    "categories",
    "createdAt",
    "updatedAt",
    "syncedAt",
    "syncStatus",
];

/// Identity used when a payload does not carry its own.
#[derive(Debug, Clone)]
pub struct RecordDefaults {
    pub id: String,
    pub user_id: String,
}

impl RecordDefaults {
    /// Defaults of the device store: the built-in demo record.
    pub fn local() -> Self {
        Self {
            id: DEFAULT_BUDGET_ID.to_string(),
            user_id: DEMO_USER_ID.to_string(),
        }
    }

    /// Defaults of the server store: a fresh id and an anonymous owner.
    pub fn server() -> Self {
        Self {
            id: generate_budget_id(),
            user_id: "unknown".to_string(),
        }
    }
}

/// Decode a JSON value into a budget.
///
/// Fails only when `value` is not an object.
pub fn decode_record(
    value: &Value,
    defaults: &RecordDefaults,
    now: DateTime<Utc>,
) -> Result<Budget, EngineError> {
    let Value::Object(fields) = value else {
        return Err(EngineError::Validation("Invalid budget data".to_string()));
    };

    let raw_categories = fields.get("categories").and_then(Value::as_object);
    let mut categories = Categories::default();
    for key in CategoryKey::ALL {
        let raw = raw_categories.and_then(|raw| raw.get(key.as_str()));
        categories.set(key, coerce_amount(raw));
    }

    Ok(Budget {
        id: coerce_text(fields.get("id")).unwrap_or_else(|| defaults.id.clone()),
        user_id: coerce_text(fields.get("userId")).unwrap_or_else(|| defaults.user_id.clone()),
        income: coerce_amount(fields.get("income")),
        categories,
        created_at: coerce_timestamp(fields.get("createdAt")).unwrap_or(now),
        updated_at: coerce_timestamp(fields.get("updatedAt")).unwrap_or(now),
        synced_at: coerce_timestamp(fields.get("syncedAt")),
        sync_status: fields
            .get("syncStatus")
            .and_then(Value::as_str)
            .and_then(SyncStatus::from_wire)
            .unwrap_or_default(),
    })
}

/// Normalize whatever the device storage returned. Never fails: absent or
/// unrecognizable input yields the built-in default record.
pub fn normalize_local(value: Option<&Value>, now: DateTime<Utc>) -> Budget {
    let Some(value) = value else {
        return default_budget(now);
    };

    let recognizable = value
        .as_object()
        .is_some_and(|fields| RECORD_FIELDS.iter().any(|field| fields.contains_key(*field)));
    if !recognizable {
        return default_budget(now);
    }

    decode_record(value, &RecordDefaults::local(), now).unwrap_or_else(|_| default_budget(now))
}

/// Numbers and numeric strings are accepted, everything else is 0.
fn coerce_amount(value: Option<&Value>) -> f64 {
    let amount = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    amount.map(clamp_amount).unwrap_or(0.0)
}

fn coerce_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// RFC 3339 strings or epoch milliseconds.
fn coerce_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        Value::Number(number) => number.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
