mod config;
mod error;
mod report;

use chrono::{Datelike, Utc};
use client::{
    BudgetStore, FileStorage, InFlight, LoginOutcome, PullPolicy, SyncClient, SyncSession,
};
use serde_json::json;

use crate::{
    config::{AppConfig, Command, PASSWORD_ENV},
    error::{CliError, Result},
};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "budgetbox_cli={level},client={level},engine={level}",
            level = config.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let tz = config.timezone()?;
    let mut store = open_store(&config);
    let policy = match command {
        Command::Pull { force: true } => PullPolicy::PreferServer,
        _ => config.pull_policy,
    };
    let mut session = SyncSession::new(SyncClient::new(&config.base_url)?, InFlight::new(), policy);

    match command {
        Command::Show { json } => {
            let Some(budget) = store.budget() else {
                return Ok(());
            };
            let day = Utc::now().with_timezone(&tz).day();
            if json {
                let out = json!({
                    "budget": budget,
                    "summary": engine::analytics::Summary::of(budget, day),
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                print!("{}", report::dashboard(budget, day));
                println!("\nStatus: {}", report::sync_line(budget, tz));
            }
        }
        Command::Income { amount } => {
            store.update_income(amount);
            let saved = store.budget().map_or(0.0, |budget| budget.income);
            println!("Income set to {}", report::money(saved));
        }
        Command::Set { category, amount } => {
            store.update_category(category, amount);
            let saved = store
                .budget()
                .map_or(0.0, |budget| budget.categories.get(category));
            println!("{} set to {}", category.label(), report::money(saved));
        }
        Command::Push => {
            session.refresh_status().await;
            if !session.can_sync(&store) {
                println!("{}", session.hint(&store));
                return Ok(());
            }
            let timestamp = session.sync(&mut store).await?;
            println!("Synced at {}", report::local_time(timestamp, tz));
        }
        Command::Pull { .. } => {
            let budget = session.pull(&mut store).await?;
            println!(
                "Pulled budget {} ({})",
                budget.id,
                report::sync_line(&budget, tz)
            );
        }
        Command::Status => {
            session.refresh_status().await;
            println!(
                "{}",
                report::server_line(session.server_status(), session.endpoints())
            );
            if let Some(budget) = store.budget() {
                println!("Budget {}: {}", budget.id, report::sync_line(budget, tz));
            }
            println!("Stored in {}", store.storage().dir().display());
            println!("{}", session.hint(&store));
        }
        Command::Login { email } => {
            let email = email.unwrap_or_else(|| config.user_id.clone());
            let password = std::env::var(PASSWORD_ENV).unwrap_or_default();
            match session.client().demo_login(&email, &password).await {
                LoginOutcome::LoggedIn { user, token } => {
                    tracing::debug!(user_id = %user.id, "logged in");
                    println!("Logged in as {} <{}>", user.name, user.email);
                    println!("Token: {token}");
                }
                LoginOutcome::Failed { error } => return Err(CliError::Login(error)),
            }
        }
        Command::Watch => watch(&config, &mut session, &store, tz).await?,
    }

    Ok(())
}

/// Open the on-disk store and adopt the configured owner.
fn open_store(config: &AppConfig) -> BudgetStore<FileStorage> {
    let mut store = BudgetStore::open(FileStorage::new(&config.state_dir));
    let foreign = store
        .budget()
        .filter(|budget| budget.user_id != config.user_id)
        .cloned();
    if let Some(mut budget) = foreign {
        tracing::info!(from = %budget.user_id, to = %config.user_id, "changing budget owner");
        budget.user_id = config.user_id.clone();
        budget.updated_at = Utc::now();
        budget.sync_status = api_types::budget::SyncStatus::Pending;
        store.set_budget(budget);
    }
    store
}

/// Poll reachability and report changes until Ctrl-C.
async fn watch(
    config: &AppConfig,
    session: &mut SyncSession,
    store: &BudgetStore<FileStorage>,
    tz: chrono_tz::Tz,
) -> Result<()> {
    let mut ticker = tokio::time::interval(config.poll_interval());
    let mut last = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            signal = tokio::signal::ctrl_c() => {
                signal?;
                return Ok(());
            }
        }

        let status = session.refresh_status().await;
        let line = format!(
            "{} | {}",
            report::server_line(status, session.endpoints()),
            session.hint(store)
        );
        if last.as_ref() != Some(&line) {
            println!("[{}] {line}", report::local_time(Utc::now(), tz));
            last = Some(line);
        }
    }
}
