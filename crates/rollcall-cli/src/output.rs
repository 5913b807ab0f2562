//! Output helpers: JSON printing and colored status lines.

use owo_colors::OwoColorize;
use serde::Serialize;

use rollcall_core::{AttendanceSession, QrPayload};

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Internal(format!("JSON encoding failed: {e}")))?;
    println!("{rendered}");
    Ok(())
}

/// One-line session summary for status/watch output.
pub fn session_line(session: &AttendanceSession) -> String {
    format!(
        "{} session {} for {} -- expires {}",
        if session.active {
            "active".green().to_string()
        } else {
            "inactive".red().to_string()
        },
        session.id,
        session.course_id,
        session.expires_at.format("%H:%M:%S"),
    )
}

/// JSON projection of a session for `--output json`.
pub fn session_json(session: &AttendanceSession) -> serde_json::Value {
    serde_json::json!({
        "id": session.id,
        "courseId": session.course_id,
        "token": session.token,
        "expiresAt": session.expires_at,
        "geofence": {
            "lat": session.geofence.center.lat,
            "lng": session.geofence.center.lng,
            "radius": session.geofence.radius_m,
        },
        "active": session.active,
    })
}

/// Render the rotating QR payload. Text mode shows the attend-URL the
/// QR would encode; screens render the actual image.
pub fn render_qr(payload: &QrPayload, seconds_remaining: i64, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "token": payload.token,
                    "url": payload.url,
                    "secondsRemaining": seconds_remaining,
                })
            );
        }
        OutputFormat::Text => {
            println!(
                "{}  {}  ({}s left)",
                payload.token.bold(),
                payload.url.underline(),
                seconds_remaining,
            );
        }
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}
