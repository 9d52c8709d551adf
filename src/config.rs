use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use config::{Config, ConfigError, Environment, File};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Deserialize;
use std::path::Path;

use crate::core::crypto::{DEFAULT_ITERATIONS, DEFAULT_KEY_CACHE_SIZE, DEFAULT_SALT};
use crate::core::matcher::DEFAULT_MAX_RESULTS;
use crate::models::ScoringThresholds;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    pub auth: AuthSettings,
    pub catalog: CatalogSettings,
    pub scoring: ScoringSettings,
    pub crypto: CryptoSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Appwrite,
}

/// Document store selection; the Appwrite fields are only read for `kind = "appwrite"`
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSettings {
    #[serde(default)]
    pub kind: BackendKind,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub database_id: String,
    #[serde(default = "default_documents_collection")]
    pub collection_id: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            endpoint: String::new(),
            api_key: String::new(),
            project_id: String::new(),
            database_id: String::new(),
            collection_id: default_documents_collection(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_documents_collection() -> String { "documents".to_string() }
fn default_request_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: i64,
    /// Window in which a sign-in counts as recent for sensitive operations
    #[serde(default = "default_recent_login_secs")]
    pub recent_login_secs: i64,
    #[serde(default = "default_max_failed_attempts")]
    pub max_failed_attempts: u32,
    #[serde(default = "default_lockout_secs")]
    pub lockout_secs: u64,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl_secs(),
            recent_login_secs: default_recent_login_secs(),
            max_failed_attempts: default_max_failed_attempts(),
            lockout_secs: default_lockout_secs(),
            password_iterations: default_password_iterations(),
        }
    }
}

/// Placeholder from older sample configs; never used as a signing key
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-in-production";

impl AuthSettings {
    /// Swap a missing or placeholder signing secret for a random one.
    ///
    /// Returns `true` when a secret was generated. Tokens signed with it stop
    /// verifying once the process exits.
    pub fn ensure_jwt_secret(&mut self) -> bool {
        let secret = self.jwt_secret.trim();
        if !secret.is_empty() && secret != PLACEHOLDER_JWT_SECRET {
            return false;
        }

        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        self.jwt_secret = BASE64.encode(bytes);
        true
    }
}

fn default_jwt_secret() -> String { String::new() }
fn default_token_ttl_secs() -> i64 { 60 * 60 * 24 }
fn default_recent_login_secs() -> i64 { 5 * 60 }
fn default_max_failed_attempts() -> u32 { 5 }
fn default_lockout_secs() -> u64 { 15 * 60 }
fn default_password_iterations() -> u32 { 100_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// JSON file to load instead of the embedded catalog
    pub path: Option<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: None,
            max_results: default_max_results(),
        }
    }
}

fn default_max_results() -> usize { DEFAULT_MAX_RESULTS }

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_target_points")]
    pub target_points: u32,
    #[serde(default = "default_safety_points")]
    pub safety_points: u32,
    #[serde(default = "default_reach_points")]
    pub reach_points: u32,
    #[serde(default = "default_gpa_reach_margin")]
    pub gpa_reach_margin: f64,
    #[serde(default = "default_sat_reach_margin")]
    pub sat_reach_margin: u32,
    #[serde(default = "default_act_reach_margin")]
    pub act_reach_margin: u32,
    #[serde(default = "default_prestige_match_points")]
    pub prestige_match_points: u32,
    #[serde(default = "default_prestige_near_points")]
    pub prestige_near_points: u32,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            target_points: default_target_points(),
            safety_points: default_safety_points(),
            reach_points: default_reach_points(),
            gpa_reach_margin: default_gpa_reach_margin(),
            sat_reach_margin: default_sat_reach_margin(),
            act_reach_margin: default_act_reach_margin(),
            prestige_match_points: default_prestige_match_points(),
            prestige_near_points: default_prestige_near_points(),
        }
    }
}

impl From<&ScoringSettings> for ScoringThresholds {
    fn from(settings: &ScoringSettings) -> Self {
        Self {
            target_points: settings.target_points,
            safety_points: settings.safety_points,
            reach_points: settings.reach_points,
            gpa_reach_margin: settings.gpa_reach_margin,
            sat_reach_margin: settings.sat_reach_margin,
            act_reach_margin: settings.act_reach_margin,
            prestige_match_points: settings.prestige_match_points,
            prestige_near_points: settings.prestige_near_points,
        }
    }
}

fn default_target_points() -> u32 { 30 }
fn default_safety_points() -> u32 { 20 }
fn default_reach_points() -> u32 { 10 }
fn default_gpa_reach_margin() -> f64 { 0.2 }
fn default_sat_reach_margin() -> u32 { 100 }
fn default_act_reach_margin() -> u32 { 2 }
fn default_prestige_match_points() -> u32 { 40 }
fn default_prestige_near_points() -> u32 { 20 }

#[derive(Debug, Clone, Deserialize)]
pub struct CryptoSettings {
    #[serde(default = "default_salt")]
    pub salt: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_key_cache_size")]
    pub key_cache_size: u64,
}

impl Default for CryptoSettings {
    fn default() -> Self {
        Self {
            salt: default_salt(),
            iterations: default_iterations(),
            key_cache_size: default_key_cache_size(),
        }
    }
}

fn default_salt() -> String { DEFAULT_SALT.to_string() }
fn default_iterations() -> u32 { DEFAULT_ITERATIONS }
fn default_key_cache_size() -> u64 { DEFAULT_KEY_CACHE_SIZE }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SUNRISE__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SUNRISE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SUNRISE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SUNRISE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Accept the conventional unprefixed secrets as well
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("JWT_SECRET", "auth.jwt_secret"),
        ("APPWRITE_ENDPOINT", "backend.endpoint"),
        ("APPWRITE_API_KEY", "backend.api_key"),
        ("APPWRITE_PROJECT_ID", "backend.project_id"),
        ("APPWRITE_DATABASE_ID", "backend.database_id"),
    ];

    let mut builder = Config::builder().add_source(settings);
    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_match_scorer() {
        let thresholds = ScoringThresholds::from(&ScoringSettings::default());
        assert_eq!(thresholds, ScoringThresholds::default());
    }

    #[test]
    fn test_unset_or_placeholder_jwt_secret_is_replaced() {
        let mut auth = AuthSettings::default();
        assert!(auth.jwt_secret.is_empty());
        assert!(auth.ensure_jwt_secret());
        assert!(auth.jwt_secret.len() >= 32);

        let generated = auth.jwt_secret.clone();
        assert!(!auth.ensure_jwt_secret());
        assert_eq!(auth.jwt_secret, generated);

        let mut legacy = AuthSettings {
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            ..Default::default()
        };
        assert!(legacy.ensure_jwt_secret());
        assert_ne!(legacy.jwt_secret, PLACEHOLDER_JWT_SECRET);
        assert_ne!(legacy.jwt_secret, generated);

        let mut configured = AuthSettings {
            jwt_secret: "a-deployment-secret".to_string(),
            ..Default::default()
        };
        assert!(!configured.ensure_jwt_secret());
        assert_eq!(configured.jwt_secret, "a-deployment-secret");
    }

    #[test]
    fn test_default_logging() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(default_log_format(), "json");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let settings: Settings = Config::builder()
            .set_override("server.port", 9090)
            .unwrap()
            .set_override("scoring.reach_points", 15)
            .unwrap()
            .set_override("backend.kind", "appwrite")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.scoring.reach_points, 15);
        assert_eq!(settings.scoring.target_points, 30);
        assert_eq!(settings.backend.kind, BackendKind::Appwrite);
        assert_eq!(settings.crypto.iterations, 100_000);
        assert_eq!(settings.catalog.max_results, 20);
    }
}
