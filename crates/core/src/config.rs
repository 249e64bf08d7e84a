use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    parse_or_default(key, profiled_env_opt(profile, key), default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    parse_or_default(key, profiled_env_opt(profile, key), default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    parse_or_default(key, profiled_env_opt(profile, key), default)
}

/// Unset keeps the default silently; a set but unparsable value warns.
fn parse_or_default<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match raw {
        None => default,
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %value, default = %default, "unparsable config value, using default");
            default
        }),
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub postgres: PostgresConfig,
    pub poller: PollerConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Build config for a named profile (empty string = default). Call
    /// `load_dotenv()` first. When set (e.g. `PROD`), every key is first
    /// looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            postgres: PostgresConfig::from_env_profiled(p),
            poller: PollerConfig::from_env_profiled(p),
            pipeline: PipelineConfig::from_env_profiled(p),
        }
    }

    /// Reject settings the poller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.poller.validate()?;
        if self.pipeline.program.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "PIPELINE_PROGRAM",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  postgres:    host={}, db={}", self.postgres.host, self.postgres.database);
        tracing::info!(
            "  poller:      reconcile={}s, heartbeat={}s, {} -> {}",
            self.poller.reconcile_interval_secs,
            self.poller.heartbeat_interval_secs,
            self.poller.raw_table,
            self.poller.output_table
        );
        tracing::info!(
            "  pipeline:    {} {}",
            self.pipeline.program,
            self.pipeline.args.join(" ")
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "postgres": {
                "host": self.postgres.host,
                "port": self.postgres.port,
                "database": self.postgres.database,
                "url_override": self.postgres.url.is_some(),
            },
            "poller": {
                "reconcile_interval_secs": self.poller.reconcile_interval_secs,
                "heartbeat_interval_secs": self.poller.heartbeat_interval_secs,
                "raw_table": self.poller.raw_table,
                "output_table": self.poller.output_table,
            },
            "pipeline": {
                "program": self.pipeline.program,
                "args": self.pipeline.args,
                "working_dir": self.pipeline.working_dir,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── PostgreSQL ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the individual fields.
    #[serde(skip_serializing)]
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub ssl_mode: String,
    pub max_connections: u32,
}

impl PostgresConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            url: profiled_env_opt(p, "DATABASE_URL"),
            host: profiled_env_or(p, "PG_HOST", "localhost"),
            port: profiled_env_u16(p, "PG_PORT", 5432),
            database: profiled_env_or(p, "PG_DATABASE", "hydraulic_monitoring"),
            username: profiled_env_opt(p, "PG_USERNAME"),
            password: profiled_env_opt(p, "PG_PASSWORD"),
            ssl_mode: profiled_env_or(p, "PG_SSL_MODE", "prefer"),
            max_connections: profiled_env_u32(p, "PG_MAX_CONNECTIONS", 5),
        }
    }

    pub fn connection_string(&self) -> String {
        let user = self.username.as_deref().unwrap_or("postgres");
        let pass = self.password.as_deref().unwrap_or("");
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            user, pass, self.host, self.port, self.database, self.ssl_mode
        )
    }

    /// `DATABASE_URL` when set, otherwise the URL assembled from the parts.
    pub fn database_url(&self) -> String {
        self.url.clone().unwrap_or_else(|| self.connection_string())
    }
}

// ── Poller ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    pub reconcile_interval_secs: u64,
    pub heartbeat_interval_secs: u64,
    /// Relation holding raw sensor readings keyed by (machine_id, cycle_id).
    pub raw_table: String,
    /// Relation holding computed diagnostic outputs for the same keys.
    pub output_table: String,
}

impl PollerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            reconcile_interval_secs: profiled_env_u64(p, "RECONCILE_INTERVAL_SECS", 10),
            heartbeat_interval_secs: profiled_env_u64(p, "HEARTBEAT_INTERVAL_SECS", 10),
            raw_table: profiled_env_or(p, "RAW_TABLE", "ps1_data"),
            output_table: profiled_env_or(p, "OUTPUT_TABLE", "model_outputs"),
        }
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reconcile_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "RECONCILE_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "HEARTBEAT_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }
        for (key, name) in [("RAW_TABLE", &self.raw_table), ("OUTPUT_TABLE", &self.output_table)] {
            if !is_sql_identifier(name) {
                return Err(ConfigError::Invalid {
                    key,
                    reason: format!("'{}' is not a plain SQL identifier", name),
                });
            }
        }
        Ok(())
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: 10,
            heartbeat_interval_secs: 10,
            raw_table: "ps1_data".to_string(),
            output_table: "model_outputs".to_string(),
        }
    }
}

/// Table names are spliced into SQL text, so only `[A-Za-z_][A-Za-z0-9_]*`
/// (optionally schema-qualified once) is accepted.
pub fn is_sql_identifier(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}

// ── External pipeline ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Executable to launch per missing key.
    pub program: String,
    /// Leading arguments; machine_id and cycle_id are appended after these.
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl PipelineConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            program: profiled_env_or(p, "PIPELINE_PROGRAM", "python"),
            args: profiled_env_or(p, "PIPELINE_ARGS", "pipeline.py")
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            working_dir: profiled_env_opt(p, "PIPELINE_WORKDIR").map(PathBuf::from),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["pipeline.py".to_string()],
            working_dir: None,
        }
    }
}
