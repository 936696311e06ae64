use std::time::Duration;

use api_types::budget::CategoryKey;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use client::PullPolicy;
use serde::Deserialize;

use crate::error::{CliError, Result};

const DEFAULT_CONFIG_PATH: &str = "config/budgetbox.toml";

/// Environment variable holding the demo login password.
pub const PASSWORD_ENV: &str = "BUDGETBOX_PASSWORD";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub user_id: String,
    pub state_dir: String,
    pub poll_interval_secs: u64,
    pub pull_policy: PullPolicy,
    pub timezone: String,
    pub level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            user_id: engine::DEMO_USER_ID.to_string(),
            state_dir: client::storage::default_state_dir().to_string(),
            poll_interval_secs: client::sync::DEFAULT_POLL_INTERVAL.as_secs(),
            pull_policy: PullPolicy::default(),
            timezone: "UTC".to_string(),
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| CliError::Timezone(self.timezone.clone()))
    }

    /// Never shorter than one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Parser)]
#[command(name = "budgetbox_cli", disable_version_flag = true)]
pub struct Args {
    /// Optional config file path (TOML).
    #[arg(long)]
    config: Option<String>,
    /// Override base URL (e.g. http://127.0.0.1:3000).
    #[arg(long)]
    base_url: Option<String>,
    /// Override the owner of the local budget.
    #[arg(long)]
    user_id: Option<String>,
    /// Override the directory holding the local budget.
    #[arg(long)]
    state_dir: Option<String>,
    /// Override the reachability polling interval, in seconds.
    #[arg(long)]
    poll_interval_secs: Option<u64>,
    /// Override what a pull does with unsynced edits (keep_local, prefer_server).
    #[arg(long)]
    pull_policy: Option<PullPolicy>,
    /// Override timezone (IANA name).
    #[arg(long)]
    timezone: Option<String>,
    /// Override log level.
    #[arg(long)]
    level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show the dashboard: totals, projection, anomalies and suggestions.
    Show {
        /// Print the record and its summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Set the monthly income.
    Income { amount: f64 },
    /// Set one category amount.
    Set { category: CategoryKey, amount: f64 },
    /// Push the local budget to the server.
    Push,
    /// Replace the local budget with the server copy.
    Pull {
        /// Overwrite unsynced local edits.
        #[arg(long)]
        force: bool,
    },
    /// Probe the server and its endpoints.
    Status,
    /// Log in with the demo account; the password is read from BUDGETBOX_PASSWORD.
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Poll server reachability until interrupted.
    Watch,
}

pub fn load() -> Result<(AppConfig, Command)> {
    resolve(Args::parse())
}

fn resolve(args: Args) -> Result<(AppConfig, Command)> {
    let config_path = args.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let mut builder = config::Config::builder();
    builder = builder.add_source(config::File::with_name(config_path).required(false));
    builder = builder.add_source(config::Environment::with_prefix("BUDGETBOX_CLI"));
    let mut settings: AppConfig = builder.build()?.try_deserialize()?;

    if let Some(base_url) = args.base_url {
        settings.base_url = base_url;
    }
    if let Some(user_id) = args.user_id {
        settings.user_id = user_id;
    }
    if let Some(state_dir) = args.state_dir {
        settings.state_dir = state_dir;
    }
    if let Some(poll_interval_secs) = args.poll_interval_secs {
        settings.poll_interval_secs = poll_interval_secs;
    }
    if let Some(pull_policy) = args.pull_policy {
        settings.pull_policy = pull_policy;
    }
    if let Some(timezone) = args.timezone {
        settings.timezone = timezone;
    }
    if let Some(level) = args.level {
        settings.level = level;
    }

    Ok((settings, args.command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> (AppConfig, Command) {
        let mut full = vec!["budgetbox_cli", "--config", "does/not/exist/budgetbox"];
        full.extend_from_slice(argv);
        resolve(Args::try_parse_from(full).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_uses_defaults() {
        let (config, command) = parse(&["status"]);
        assert_eq!(config.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.user_id, engine::DEMO_USER_ID);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.pull_policy, PullPolicy::KeepLocal);
        assert!(matches!(command, Command::Status));
    }

    #[test]
    fn flags_override_config() {
        let (config, command) = parse(&[
            "--base-url",
            "http://budget.internal:8080",
            "--pull-policy",
            "prefer_server",
            "--poll-interval-secs",
            "0",
            "--timezone",
            "Europe/Rome",
            "set",
            "monthly-bills",
            "1200.5",
        ]);
        assert_eq!(config.base_url, "http://budget.internal:8080");
        assert_eq!(config.pull_policy, PullPolicy::PreferServer);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.timezone().unwrap(), chrono_tz::Europe::Rome);
        assert!(matches!(
            command,
            Command::Set {
                category: CategoryKey::MonthlyBills,
                amount
            } if amount == 1200.5
        ));
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let config = AppConfig {
            timezone: "Mars/Olympus".to_string(),
            ..AppConfig::default()
        };
        assert!(matches!(config.timezone(), Err(CliError::Timezone(_))));
    }

    #[test]
    fn unknown_category_is_rejected_by_the_parser() {
        assert!(
            Args::try_parse_from(["budgetbox_cli", "set", "rent", "10"]).is_err()
        );
    }
}
