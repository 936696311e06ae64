//! Handles settings for the server. Configuration is read from an optional
//! `settings.toml` next to the binary, then from `BUDGETBOX__*` environment
//! variables (e.g. `BUDGETBOX__SERVER__PORT=8080`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct App {
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: None,
            port: 3000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: App,
    pub server: Server,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("settings")
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("BUDGETBOX").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
