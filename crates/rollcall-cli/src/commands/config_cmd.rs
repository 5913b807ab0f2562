//! Config command handlers (no server connection required).

use rollcall_config::Profile;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init {
            server,
            course,
            name,
        } => init(&server, course, &name, global),
        ConfigCommand::Show => show(),
        ConfigCommand::Path => {
            println!("{}", rollcall_config::config_path().display());
            Ok(())
        }
    }
}

fn init(
    server: &str,
    course: Option<String>,
    name: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Fail fast on a bad URL before anything touches disk.
    let _: url::Url = server.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {server}"),
    })?;

    let mut config = rollcall_config::load_config_or_default();
    config.profiles.insert(
        name.to_owned(),
        Profile {
            server: server.to_owned(),
            course,
            bearer_token: None,
            bearer_token_env: None,
            radius_m: None,
            duration_secs: None,
            timeout: None,
        },
    );
    // Point the default at this profile unless one already resolves.
    let default_resolves = config
        .default_profile
        .as_ref()
        .is_some_and(|d| config.profiles.contains_key(d));
    if !default_resolves {
        config.default_profile = Some(name.to_owned());
    }

    rollcall_config::save_config(&config)?;
    if !global.quiet {
        eprintln!(
            "Profile '{name}' saved to {}",
            rollcall_config::config_path().display()
        );
    }
    Ok(())
}

fn show() -> Result<(), CliError> {
    let config = rollcall_config::load_config_or_default();
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| CliError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}
