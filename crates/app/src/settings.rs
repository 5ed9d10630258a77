//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml`, then overlaid by `MONOGESTION__*` environment
//! variables (`MONOGESTION__SERVER__PORT=8080`).
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Deployment {
    Development,
    Production,
}

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
    pub environment: Deployment,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub window_seconds: u64,
    /// Key clients by `x-forwarded-for`. Enable only behind a reverse proxy.
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub rate_limit: RateLimit,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("settings")
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .set_default("app.environment", "production")?
            .set_default("server.bind", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.database", "memory")?
            .set_default("rate_limit.requests", 100)?
            .set_default("rate_limit.window_seconds", 60)?
            .set_default("rate_limit.trust_forwarded_for", false)?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MONOGESTION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = Settings::from_file("does-not-exist").unwrap();
        assert_eq!(settings.app.level, "info");
        assert_eq!(settings.app.environment, Deployment::Production);
        assert_eq!(settings.server.bind, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert!(matches!(settings.server.database, Database::Memory));
        assert_eq!(settings.rate_limit.requests, 100);
        assert_eq!(settings.rate_limit.window_seconds, 60);
        assert!(!settings.rate_limit.trust_forwarded_for);
    }
}
