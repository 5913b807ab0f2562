//! GlobalOpts-aware wrappers around `rollcall-config`.
//!
//! Flag and env overrides sit on top of the profile chain: `--server`
//! bypasses profiles entirely, `--token` bypasses token resolution,
//! `--timeout` overrides the profile's timeout.

use std::time::Duration;

use secrecy::SecretString;

use rollcall_api::AttendanceClient;
use rollcall_config::{Config, Profile};
use rollcall_core::SessionDefaults;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// A resolved profile plus the config it came from.
pub struct Resolved {
    pub config: Config,
    pub profile_name: String,
    pub profile: Profile,
}

/// Resolve the active profile from config + global flags.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let config = rollcall_config::load_config_or_default();

    // --server bypasses the profile mechanism entirely.
    if let Some(ref server) = global.server {
        return Ok(Resolved {
            profile_name: "(cli)".into(),
            profile: Profile {
                server: server.clone(),
                course: None,
                bearer_token: None,
                bearer_token_env: None,
                radius_m: None,
                duration_secs: None,
                timeout: None,
            },
            config,
        });
    }

    if config.profiles.is_empty() {
        return Err(CliError::NoConfig {
            path: rollcall_config::config_path().display().to_string(),
        });
    }

    let (name, profile) = rollcall_config::select_profile(&config, global.profile.as_deref())?;
    let (profile_name, profile) = (name.to_owned(), profile.clone());
    Ok(Resolved {
        config,
        profile_name,
        profile,
    })
}

impl Resolved {
    /// Authenticated client for lecturer commands.
    pub fn lecturer_client(&self, global: &GlobalOpts) -> Result<AttendanceClient, CliError> {
        let mut server =
            rollcall_config::profile_to_anonymous_config(&self.profile, &self.config.defaults)?;

        server.bearer_token = match global.token {
            Some(ref t) => Some(SecretString::from(t.clone())),
            None => Some(rollcall_config::resolve_bearer_token(
                &self.profile,
                &self.profile_name,
            )?),
        };
        if let Some(secs) = global.timeout {
            server.timeout = Duration::from_secs(secs);
        }

        server.build_client().map_err(CliError::from)
    }

    /// Unauthenticated client for the student scan path.
    pub fn student_client(&self, global: &GlobalOpts) -> Result<AttendanceClient, CliError> {
        let mut server =
            rollcall_config::profile_to_anonymous_config(&self.profile, &self.config.defaults)?;
        if let Some(secs) = global.timeout {
            server.timeout = Duration::from_secs(secs);
        }
        server.build_client().map_err(CliError::from)
    }

    /// Merged session tunables (config defaults + profile overrides).
    pub fn session_defaults(&self) -> Result<SessionDefaults, CliError> {
        rollcall_config::session_defaults(&self.config.defaults, &self.profile)
            .map_err(CliError::from)
    }

    /// Resolve the course: flag first, then the profile.
    pub fn course(&self, flag: Option<&str>) -> Result<String, CliError> {
        flag.map(str::to_owned)
            .or_else(|| self.profile.course.clone())
            .ok_or_else(|| CliError::Validation {
                field: "course".into(),
                reason: "pass --course or set `course` in the profile".into(),
            })
    }
}
