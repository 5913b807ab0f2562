//! Shared configuration for the rollcall CLI.
//!
//! TOML profiles, bearer-token resolution (env + plaintext), and
//! translation to `rollcall_core::ServerConfig` / `SessionDefaults`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rollcall_core::{ServerConfig, SessionDefaults};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no bearer token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global session tunables.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

/// Session tunables with the protocol defaults. Profiles may override
/// radius and duration per venue.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    #[serde(default = "default_radius")]
    pub radius_m: f64,

    #[serde(default = "default_rotation")]
    pub rotation_interval_secs: u64,

    #[serde(default = "default_accuracy_clamp")]
    pub accuracy_clamp_m: f64,

    #[serde(default = "default_poll")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            duration_secs: default_duration(),
            radius_m: default_radius(),
            rotation_interval_secs: default_rotation(),
            accuracy_clamp_m: default_accuracy_clamp(),
            poll_interval_secs: default_poll(),
            timeout: default_timeout(),
        }
    }
}

fn default_duration() -> u64 {
    600
}
fn default_radius() -> f64 {
    60.0
}
fn default_rotation() -> u64 {
    10
}
fn default_accuracy_clamp() -> f64 {
    100.0
}
fn default_poll() -> u64 {
    15
}
fn default_timeout() -> u64 {
    15
}

/// A named attendance-server profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://attendance.example.edu").
    pub server: String,

    /// Default course for lecturer commands.
    pub course: Option<String>,

    /// Bearer token (plaintext — prefer the env var).
    pub bearer_token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub bearer_token_env: Option<String>,

    /// Override geofence radius in metres.
    pub radius_m: Option<f64>,

    /// Override session duration in seconds.
    pub duration_secs: Option<u64>,

    /// Override request timeout in seconds.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("app", "rollcall", "rollcall").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("rollcall");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit path (tests, `--config` flag).
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ROLLCALL_").split("_"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Write to an explicit path.
pub fn save_config_to(cfg: &Config, path: &std::path::Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profile lookup ──────────────────────────────────────────────────

/// Pick a profile by explicit name, falling back to `default_profile`.
pub fn select_profile<'c>(
    config: &'c Config,
    name: Option<&'c str>,
) -> Result<(&'c str, &'c Profile), ConfigError> {
    let name = name
        .or(config.default_profile.as_deref())
        .ok_or_else(|| ConfigError::Validation {
            field: "profile".into(),
            reason: "no profile named and no default_profile set".into(),
        })?;

    let profile = config
        .profiles
        .get(name)
        .ok_or_else(|| ConfigError::Validation {
            field: "profile".into(),
            reason: format!("profile '{name}' not found"),
        })?;

    Ok((name, profile))
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve a bearer token from the credential chain.
pub fn resolve_bearer_token(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's bearer_token_env → env var lookup
    if let Some(ref env_name) = profile.bearer_token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Well-known env var
    if let Ok(val) = std::env::var("ROLLCALL_TOKEN") {
        return Ok(SecretString::from(val));
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.bearer_token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to core configs ─────────────────────────────────────

fn parse_server_url(profile: &Profile) -> Result<url::Url, ConfigError> {
    profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })
}

/// Build an authenticated `ServerConfig` — the lecturer path.
pub fn profile_to_server_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ServerConfig, ConfigError> {
    let mut server = ServerConfig::new(parse_server_url(profile)?);
    server.bearer_token = Some(resolve_bearer_token(profile, profile_name)?);
    server.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(server)
}

/// Build an unauthenticated `ServerConfig` — the student scan path.
pub fn profile_to_anonymous_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ServerConfig, ConfigError> {
    let mut server = ServerConfig::new(parse_server_url(profile)?);
    server.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(server)
}

/// Merge global defaults with per-profile overrides into the session
/// tunables the controller consumes.
pub fn session_defaults(
    defaults: &Defaults,
    profile: &Profile,
) -> Result<SessionDefaults, ConfigError> {
    let radius_m = profile.radius_m.unwrap_or(defaults.radius_m);
    if !radius_m.is_finite() || radius_m <= 0.0 {
        return Err(ConfigError::Validation {
            field: "radius_m".into(),
            reason: format!("must be a positive number of metres, got {radius_m}"),
        });
    }

    let duration_secs = profile.duration_secs.unwrap_or(defaults.duration_secs);
    if duration_secs == 0 {
        return Err(ConfigError::Validation {
            field: "duration_secs".into(),
            reason: "session duration must be at least one second".into(),
        });
    }

    if defaults.rotation_interval_secs == 0 {
        return Err(ConfigError::Validation {
            field: "rotation_interval_secs".into(),
            reason: "rotation interval must be at least one second".into(),
        });
    }

    Ok(SessionDefaults {
        duration: Duration::from_secs(duration_secs),
        radius_m,
        rotation_interval: Duration::from_secs(defaults.rotation_interval_secs),
        accuracy_clamp_m: defaults.accuracy_clamp_m,
        poll_interval: Duration::from_secs(defaults.poll_interval_secs),
    })
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(server: &str) -> Profile {
        Profile {
            server: server.into(),
            course: None,
            bearer_token: None,
            bearer_token_env: None,
            radius_m: None,
            duration_secs: None,
            timeout: None,
        }
    }

    #[test]
    fn parses_minimal_profile_toml() {
        let config: Config = toml::from_str(
            r#"
            default_profile = "campus"

            [profiles.campus]
            server = "https://attendance.example.edu"
            course = "COS301"
            "#,
        )
        .unwrap();

        let (name, campus) = select_profile(&config, None).unwrap();
        assert_eq!(name, "campus");
        assert_eq!(campus.course.as_deref(), Some("COS301"));
        assert_eq!(config.defaults.duration_secs, 600);
        assert_eq!(config.defaults.radius_m, 60.0);
        assert_eq!(config.defaults.rotation_interval_secs, 10);
    }

    #[test]
    fn unknown_profile_is_a_validation_error() {
        let config = Config::default();
        let err = select_profile(&config, Some("nope")).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn profile_overrides_beat_defaults() {
        let mut p = profile("https://a.example");
        p.radius_m = Some(120.0);
        p.duration_secs = Some(1800);

        let merged = session_defaults(&Defaults::default(), &p).unwrap();
        assert_eq!(merged.radius_m, 120.0);
        assert_eq!(merged.duration, Duration::from_secs(1800));
        assert_eq!(merged.rotation_interval, Duration::from_secs(10));
    }

    #[test]
    fn nonpositive_radius_is_rejected() {
        let mut p = profile("https://a.example");
        p.radius_m = Some(0.0);
        let err = session_defaults(&Defaults::default(), &p).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "radius_m"));
    }

    #[test]
    fn plaintext_token_resolves_last() {
        let mut p = profile("https://a.example");
        p.bearer_token = Some("tok-plain".into());
        let secret = resolve_bearer_token(&p, "campus").unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(secret.expose_secret(), "tok-plain");
    }

    #[test]
    fn missing_token_names_the_profile() {
        let p = profile("https://a.example");
        let err = resolve_bearer_token(&p, "campus").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { ref profile } if profile == "campus"));
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let p = profile("not a url");
        let err = profile_to_anonymous_config(&p, &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));
    }

    #[test]
    fn config_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config
            .profiles
            .insert("campus".into(), profile("https://attendance.example.edu"));
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert!(loaded.profiles.contains_key("campus"));
        assert_eq!(loaded.default_profile.as_deref(), Some("default"));
    }
}
