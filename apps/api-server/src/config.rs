//! Centralized configuration for api-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time.

use axum::http::HeaderValue;
use std::env;
use std::fmt;
use std::path::PathBuf;

/// Optional application components selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// Serve the `/profiles` HTTP routes.
    Classic,
    /// Wipe and reseed the store with demo profiles once the server is ready.
    Demo,
}

impl AppMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Some(Self::Classic),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
    /// AWS DynamoDB table
    Dynamo,
}

impl StorageProvider {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("sqlite") {
            Self::Sqlite
        } else if s.eq_ignore_ascii_case("dynamo") {
            Self::Dynamo
        } else {
            Self::Memory
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Configuration error for {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Server configuration loaded from environment variables.
///
/// All fields are validated at construction time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3001)
    pub port: u16,
    /// Active components (default: classic)
    pub modes: Vec<AppMode>,
    /// CORS allow origin
    pub cors_allow_origin: HeaderValue,
    /// Storage provider
    pub storage_provider: StorageProvider,
    /// SQLite database path (default: ./data/profiles.db)
    pub db_path: PathBuf,
    /// DynamoDB table name (when using dynamo storage)
    pub dynamo_table: Option<String>,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// Fails fast on invalid configuration.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Port
        let port = match lookup("PORT") {
            Some(s) => s.parse().map_err(|e| ConfigError {
                field: "PORT",
                message: format!("Invalid port '{}': {}", s, e),
            })?,
            None => 3001,
        };

        // Modes
        let modes = parse_modes(&lookup("APP_MODES").unwrap_or_else(|| "classic".into()))?;

        // CORS allow origin
        let cors_origin_str = lookup("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".into());
        let cors_allow_origin = if cors_origin_str == "*" {
            HeaderValue::from_static("*")
        } else {
            HeaderValue::from_str(&cors_origin_str).map_err(|e| ConfigError {
                field: "CORS_ALLOW_ORIGIN",
                message: format!("Invalid header value '{}': {}", cors_origin_str, e),
            })?
        };

        // Storage provider
        let storage_provider = StorageProvider::from_str(
            &lookup("STORAGE_PROVIDER").unwrap_or_else(|| "sqlite".into()),
        );

        // DB path (for sqlite)
        let db_path = lookup("DB_PATH")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/profiles.db"));

        // Dynamo table
        let dynamo_table = lookup("DYNAMO_TABLE_PROFILES").filter(|s| !s.is_empty());
        if storage_provider == StorageProvider::Dynamo && dynamo_table.is_none() {
            return Err(ConfigError {
                field: "DYNAMO_TABLE_PROFILES",
                message: "Required when STORAGE_PROVIDER=dynamo".into(),
            });
        }

        // Log format
        let log_format =
            LogFormat::from_str(&lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".into()));

        Ok(Self {
            port,
            modes,
            cors_allow_origin,
            storage_provider,
            db_path,
            dynamo_table,
            log_format,
        })
    }

    pub fn is_active(&self, mode: AppMode) -> bool {
        self.modes.contains(&mode)
    }

    /// Log warnings about surprising configuration.
    pub fn warn_if_unusual(&self) {
        if self.is_active(AppMode::Demo) {
            tracing::warn!(
                storage = ?self.storage_provider,
                "APP_MODES includes demo: all stored profiles will be replaced by sample data"
            );
        }
        if !self.is_active(AppMode::Classic) {
            tracing::warn!("APP_MODES excludes classic: /profiles routes are not served");
        }
    }
}

fn parse_modes(raw: &str) -> Result<Vec<AppMode>, ConfigError> {
    let mut modes = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mode = AppMode::parse(name).ok_or_else(|| ConfigError {
            field: "APP_MODES",
            message: format!("Unknown mode '{}', expected classic or demo", name),
        })?;
        if !modes.contains(&mode) {
            modes.push(mode);
        }
    }
    if modes.is_empty() {
        return Err(ConfigError {
            field: "APP_MODES",
            message: "At least one mode is required".into(),
        });
    }
    Ok(modes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.port, 3001);
        assert_eq!(cfg.modes, vec![AppMode::Classic]);
        assert_eq!(cfg.storage_provider, StorageProvider::Sqlite);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.cors_allow_origin, HeaderValue::from_static("*"));
        assert_eq!(cfg.db_path, PathBuf::from("./data/profiles.db"));
    }

    #[test]
    fn modes_parsing() {
        let cfg = load(&[("APP_MODES", "classic, DEMO")]).unwrap();
        assert!(cfg.is_active(AppMode::Classic));
        assert!(cfg.is_active(AppMode::Demo));

        let cfg = load(&[("APP_MODES", "demo,demo")]).unwrap();
        assert_eq!(cfg.modes, vec![AppMode::Demo]);

        let err = load(&[("APP_MODES", "classic,functional")]).unwrap_err();
        assert_eq!(err.field, "APP_MODES");

        let err = load(&[("APP_MODES", " , ")]).unwrap_err();
        assert_eq!(err.field, "APP_MODES");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = load(&[("PORT", "http")]).unwrap_err();
        assert_eq!(err.field, "PORT");
    }

    #[test]
    fn dynamo_requires_table() {
        let err = load(&[("STORAGE_PROVIDER", "dynamo")]).unwrap_err();
        assert_eq!(err.field, "DYNAMO_TABLE_PROFILES");

        let cfg = load(&[
            ("STORAGE_PROVIDER", "dynamo"),
            ("DYNAMO_TABLE_PROFILES", "profiles"),
        ])
        .unwrap();
        assert_eq!(cfg.dynamo_table.as_deref(), Some("profiles"));
    }

    #[test]
    fn storage_provider_parsing() {
        assert_eq!(StorageProvider::from_str("memory"), StorageProvider::Memory);
        assert_eq!(StorageProvider::from_str("sqlite"), StorageProvider::Sqlite);
        assert_eq!(StorageProvider::from_str("SQLITE"), StorageProvider::Sqlite);
        assert_eq!(StorageProvider::from_str("Dynamo"), StorageProvider::Dynamo);
        assert_eq!(StorageProvider::from_str("anything"), StorageProvider::Memory);
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(LogFormat::from_str("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_str("anything"), LogFormat::Pretty);
    }

    #[test]
    fn invalid_cors_origin_is_rejected() {
        let err = load(&[("CORS_ALLOW_ORIGIN", "bad\norigin")]).unwrap_err();
        assert_eq!(err.field, "CORS_ALLOW_ORIGIN");
    }
}
