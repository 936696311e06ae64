//! Plain-text rendering of the dashboard and sync state.

use std::fmt::Write;

use api_types::budget::{Budget, CategoryKey};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use client::{EndpointStatus, ServerStatus};
use engine::analytics::{self, Summary};

pub fn money(amount: f64) -> String {
    format!("{amount:.2}")
}

pub fn dashboard(budget: &Budget, day_of_month: u32) -> String {
    let summary = Summary::of(budget, day_of_month);
    let mut out = String::new();

    let _ = writeln!(out, "Income          {:>12}", money(summary.income));
    for key in CategoryKey::ALL {
        let _ = writeln!(
            out,
            "  {:<14}{:>12}",
            key.label(),
            money(budget.categories.get(key))
        );
    }
    let _ = writeln!(out, "Total expenses  {:>12}", money(summary.total_expenses));
    let _ = writeln!(out, "Savings         {:>12}", money(summary.savings));
    let _ = writeln!(out, "Burn rate       {:>11.1}%", summary.burn_rate);
    let _ = writeln!(
        out,
        "Projection      {:>12}  ({} per day, day {})",
        money(summary.month_end_projection),
        money(summary.daily_spend_rate),
        day_of_month.clamp(1, 31)
    );
    if summary.over_budget() {
        let _ = writeln!(out, "Over budget");
    }

    let shares = analytics::category_shares(budget);
    if !shares.is_empty() {
        let _ = writeln!(out, "\nShare of expenses");
        for (key, share) in shares {
            let _ = writeln!(out, "  {:<14}{:>6.1}%", key.label(), share * 100.0);
        }
    }

    let anomalies = analytics::anomalies(budget);
    if !anomalies.is_empty() {
        let _ = writeln!(out, "\nAnomalies");
        for anomaly in anomalies {
            let _ = writeln!(
                out,
                "  [{:?}/{:?}] {}",
                anomaly.kind, anomaly.severity, anomaly.message
            );
        }
    }

    let _ = writeln!(out, "\nSuggestions");
    for suggestion in analytics::suggestions(budget) {
        let _ = writeln!(out, "  {}: {}", suggestion.title, suggestion.description);
        let _ = writeln!(out, "    -> {}", suggestion.action);
    }

    out
}

pub fn sync_line(budget: &Budget, tz: Tz) -> String {
    match budget.synced_at {
        Some(at) => format!("{} (last synced {})", budget.sync_status, local_time(at, tz)),
        None => budget.sync_status.to_string(),
    }
}

pub fn server_line(status: ServerStatus, endpoints: Option<EndpointStatus>) -> String {
    let mut out = format!("Server: {status:?}");
    if let Some(endpoints) = endpoints {
        for (name, up) in endpoints.entries() {
            let _ = write!(out, "  {name}:{}", if up { "ok" } else { "missing" });
        }
    }
    out
}

pub fn local_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn demo() -> Budget {
        engine::default_budget(Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn dashboard_shows_demo_figures() {
        let out = dashboard(&demo(), 10);
        assert!(out.contains("50000.00"));
        assert!(out.contains("33000.00"));
        assert!(out.contains("17000.00"));
        assert!(out.contains("66.0%"));
        // 33000 over 10 days, projected to 30.
        assert!(out.contains("99000.00"));
        assert!(!out.contains("Over budget"));
        assert!(!out.contains("Anomalies"));
    }

    #[test]
    fn dashboard_flags_overspending() {
        let mut budget = demo();
        budget.income = 10_000.0;
        let out = dashboard(&budget, 1);
        assert!(out.contains("Over budget"));
        assert!(out.contains("Expenses exceed income this month"));
        assert!(out.contains("Expenses Exceed Income"));
    }

    #[test]
    fn sync_line_uses_the_configured_timezone() {
        let mut budget = demo();
        assert_eq!(sync_line(&budget, chrono_tz::UTC), "local");

        budget.sync_status = api_types::budget::SyncStatus::Synced;
        budget.synced_at = Some(Utc.with_ymd_and_hms(2025, 3, 10, 23, 30, 0).unwrap());
        assert_eq!(
            sync_line(&budget, chrono_tz::Europe::Rome),
            "synced (last synced 2025-03-11 00:30:00 CET)"
        );
    }

    #[test]
    fn server_line_lists_endpoints() {
        let endpoints = EndpointStatus {
            health: true,
            auth: true,
            sync: false,
            latest: true,
        };
        assert_eq!(
            server_line(ServerStatus::Online, Some(endpoints)),
            "Server: Online  health:ok  auth:ok  sync:missing  latest:ok"
        );
        assert_eq!(server_line(ServerStatus::Offline, None), "Server: Offline");
    }
}
