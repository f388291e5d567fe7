use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ErrorCode;

pub const CONFIG_FILE: &str = "config.toml";
pub const DATA_DIR_ENV: &str = "HELPDESK_DATA_DIR";
pub const AUTH_DELAY_ENV: &str = "HELPDESK_AUTH_DELAY_MS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: failed to read {}", ErrorCode::ConfigParseError, .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: failed to parse {}: {source}", ErrorCode::ConfigParseError, .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{}: {var} must be {expected}, got '{value}'", ErrorCode::ConfigParseError)]
    InvalidEnv {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error("no data directory: set {DATA_DIR_ENV} or pass --data-dir")]
    NoDataDir,
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Parse { .. } | Self::InvalidEnv { .. } => {
                ErrorCode::ConfigParseError
            }
            Self::NoDataDir => ErrorCode::InternalUnexpected,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub views: ViewConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Simulated authentication latency.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_admin_recent_limit")]
    pub admin_recent_limit: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
            admin_recent_limit: default_admin_recent_limit(),
        }
    }
}

impl AppConfig {
    #[must_use]
    pub const fn auth_delay(&self) -> Duration {
        Duration::from_millis(self.auth.delay_ms)
    }

    /// Layer environment overrides on top of file values.
    pub fn apply_env(&mut self, auth_delay: Option<&str>) -> Result<(), ConfigError> {
        if let Some(raw) = auth_delay {
            self.auth.delay_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidEnv {
                        var: AUTH_DELAY_ENV,
                        expected: "a whole number of milliseconds",
                        value: raw.to_string(),
                    })?;
        }
        Ok(())
    }
}

/// Everything a command needs to know before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub data_dir: PathBuf,
    pub app: AppConfig,
    pub resolved_output: String,
}

/// Pick the data directory: explicit flag, then env, then the platform
/// data dir.
pub fn resolve_data_dir(
    cli_dir: Option<&Path>,
    env_dir: Option<String>,
) -> Result<PathBuf, ConfigError> {
    if let Some(dir) = cli_dir {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = env_dir.filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|d| d.join("helpdesk"))
        .ok_or(ConfigError::NoDataDir)
}

pub fn load_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    toml::from_str::<AppConfig>(&content).map_err(|source| ConfigError::Parse { path, source })
}

/// Resolve data dir, file config and env overrides from the process
/// environment.
pub fn resolve_config(cli_dir: Option<&Path>, cli_json: bool) -> Result<EffectiveConfig, ConfigError> {
    let data_dir = resolve_data_dir(cli_dir, env::var(DATA_DIR_ENV).ok())?;
    let mut app = load_config(&data_dir)?;
    app.apply_env(env::var(AUTH_DELAY_ENV).ok().as_deref())?;

    let resolved_output = resolve_output(
        cli_json,
        app.output.as_deref(),
        env::var("FORMAT").ok().as_deref(),
        std::io::stdout().is_terminal(),
    );

    Ok(EffectiveConfig {
        data_dir,
        app,
        resolved_output: resolved_output.to_string(),
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
    is_tty: bool,
) -> &'static str {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json";
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode;
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode;
    }

    if is_tty { "pretty" } else { "text" }
}

const fn default_delay_ms() -> u64 {
    1000
}

const fn default_recent_limit() -> usize {
    5
}

const fn default_admin_recent_limit() -> usize {
    10
}
