use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    App(#[from] client::AppError),
    #[error("sync failed: {0}")]
    Sync(#[from] client::SyncError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unknown timezone \"{0}\"")]
    Timezone(String),
    #[error("login failed: {0}")]
    Login(String),
}
