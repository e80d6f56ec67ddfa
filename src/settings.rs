use std::{env, fmt, path::PathBuf};

use config::{Config, ConfigError, Environment, File};
use dotenv::dotenv;
use serde::Deserialize;

/// Deployment stage, read from `APP_ENV`.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    #[default]
    Development,
    Production,
    Testing,
}

impl AppEnvironment {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnvironment::Development),
            "production" | "prod" => Ok(AppEnvironment::Production),
            "testing" | "test" => Ok(AppEnvironment::Testing),
            other => Err(ConfigError::Message(format!("Invalid APP_ENV value: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        }
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub worker_count: usize,
    /// Entries may themselves be comma separated lists.
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            name: "Site-CMS".into(),
            host: "127.0.0.1".into(),
            port: 5000,
            worker_count: num_cpus::get(),
            cors_allowed_origins: vec!["*".into()],
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings { jwt_secret: String::new(), jwt_expiration_minutes: 60 * 24 }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("jwt_secret", &secret_state(&self.jwt_secret))
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct UploadSettings {
    pub dir: String,
    pub max_file_mb: u64,
    pub max_files_per_request: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        UploadSettings { dir: "uploads".into(), max_file_mb: 10, max_files_per_request: 10 }
    }
}

/// Backend configuration, layered from `config/default`, `config/{APP_ENV}`
/// and `APP_*` variables such as `APP_SERVER__PORT` or `APP_AUTH__JWT_SECRET`.
#[derive(Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(skip)]
    pub env: AppEnvironment,
    pub server: ServerSettings,
    /// Empty selects the in-memory document store.
    pub database_url: String,
    pub auth: AuthSettings,
    pub uploads: UploadSettings,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let env = match env::var("APP_ENV") {
            Ok(raw) => AppEnvironment::parse(&raw)?,
            Err(_) => AppEnvironment::default(),
        };

        let mut config: AppConfig = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true),
            )
            .build()?
            .try_deserialize()?;
        config.env = env;

        // Conventional unsectioned names used by hosting platforms.
        if config.database_url.trim().is_empty() {
            config.database_url = env::var("DATABASE_URL").unwrap_or_default();
        }
        if config.auth.jwt_secret.trim().is_empty() {
            config.auth.jwt_secret = env::var("JWT_SECRET").unwrap_or_default();
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.auth.jwt_secret.len() < 32 {
            problems.push("the JWT secret must be at least 32 characters");
        }
        if self.uploads.max_file_mb == 0 {
            problems.push("uploads.max_file_mb must be greater than zero");
        }
        if self.uploads.max_files_per_request == 0 {
            problems.push("uploads.max_files_per_request must be greater than zero");
        }
        if self.is_production() {
            if !self.uses_database() {
                problems.push("a database URL is required in production");
            }
            if self.cors_origins().iter().any(|o| o == "*") {
                problems.push("wildcard CORS (*) is not allowed in production");
            }
        }

        match problems.is_empty() {
            true => Ok(()),
            false => Err(ConfigError::Message(format!("Invalid configuration: {}", problems.join("; ")))),
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn uses_database(&self) -> bool {
        !self.database_url.trim().is_empty()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn upload_path(&self) -> PathBuf {
        PathBuf::from(&self.uploads.dir)
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.uploads.max_file_mb * 1024 * 1024) as usize
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.server
            .cors_allowed_origins
            .iter()
            .flat_map(|entry| entry.split(','))
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn secret_state(secret: &str) -> &'static str {
    match secret.len() {
        0 => "[MISSING]",
        n if n < 32 => "[TOO_SHORT]",
        _ => "[REDACTED]",
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let database = if self.uses_database() { "[REDACTED]" } else { "[IN-MEMORY]" };

        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("server", &self.server)
            .field("database_url", &database)
            .field("auth", &self.auth)
            .field("uploads", &self.uploads)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "a".repeat(40);
        config.uploads.max_file_mb = 2;
        config
    }

    #[test]
    fn defaults_are_valid_for_development() {
        assert!(base_config().validate().is_ok());
        assert_eq!(base_config().bind_address(), "127.0.0.1:5000");
    }

    #[test]
    fn production_rejects_wildcard_cors_and_missing_database() {
        let mut config = base_config();
        config.env = AppEnvironment::Production;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("database URL"));
        assert!(err.contains("wildcard CORS"));
    }

    #[test]
    fn short_secrets_are_rejected() {
        let mut config = base_config();
        config.auth.jwt_secret = "short".into();

        assert!(config.validate().is_err());
    }

    #[test]
    fn cors_origins_split_comma_lists() {
        let mut config = base_config();
        config.server.cors_allowed_origins = vec!["https://a.example, https://b.example".into()];

        assert_eq!(config.cors_origins(), vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn debug_output_redacts_secret() {
        let rendered = format!("{:?}", base_config());
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("[IN-MEMORY]"));
        assert!(!rendered.contains(&"a".repeat(40)));
    }

    #[test]
    fn environment_names_accept_short_forms() {
        assert_eq!(AppEnvironment::parse("PROD").unwrap(), AppEnvironment::Production);
        assert_eq!(AppEnvironment::parse("test").unwrap(), AppEnvironment::Testing);
        assert!(AppEnvironment::parse("staging").is_err());
    }

    #[test]
    fn max_upload_bytes_converts_megabytes() {
        assert_eq!(base_config().max_upload_bytes(), 2 * 1024 * 1024);
    }
}
