use std::{net::SocketAddr, time::Duration};

use migration::{Migrator, MigratorTrait};
use settings::{Database, Deployment};

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "monogestion={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    tracing::info!(environment = ?settings.app.environment, "starting MonoGestión");

    let db = parse_database(&settings.server.database).await?;
    let engine = engine::Engine::builder().database(db).build().await?;

    let addr: SocketAddr = format!("{}:{}", settings.server.bind, settings.server.port).parse()?;
    let config = server::ServerConfig {
        rate_limit_requests: settings.rate_limit.requests,
        rate_limit_window: Duration::from_secs(settings.rate_limit.window_seconds),
        trust_forwarded_for: settings.rate_limit.trust_forwarded_for,
        expose_internal_errors: settings.app.environment == Deployment::Development,
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, listener, config).await?;

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("database migrated");
    Ok(database)
}
