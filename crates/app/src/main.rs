mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "budgetbox={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let engine = engine::Engine::builder().build();
    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("budget records are kept in memory and lost on restart");
    server::run_with_listener(engine, listener).await?;
    Ok(())
}
