//! Student scan command handler.

use owo_colors::OwoColorize;

use rollcall_core::{
    GeoPoint, GeoSampler, SamplerPolicy, ScanOutcome, ScanPhase, ScanVerifier,
};

use crate::cli::{GlobalOpts, OutputFormat, ScanArgs};
use crate::config;
use crate::error::CliError;
use crate::output;
use crate::sources::{FixedLocationSource, PastedTokenSource};

pub async fn handle(args: ScanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    let client = resolved.student_client(global)?;

    let token = extract_token(&args.token);
    let mut verifier = ScanVerifier::new(client);

    match verifier.load(token).await {
        ScanPhase::Valid => {}
        ScanPhase::Expired => {
            return Err(CliError::SessionExpired {
                message: "this QR code is no longer valid".into(),
            })
        }
        // Load failures are network-shaped: offline, unreachable, 5xx.
        ScanPhase::Error(reason) => return Err(CliError::ConnectionFailed { reason }),
        phase => {
            return Err(CliError::Internal(format!(
                "unexpected phase after load: {phase:?}"
            )))
        }
    }

    if !global.quiet {
        if let Some(session) = verifier.session() {
            eprintln!(
                "Session for {} -- {}s remaining",
                session.course_id,
                verifier.seconds_remaining()
            );
        }
    }

    // Local feedback only; the server still decides. The flag-fed
    // position goes through the student sampler so the same lock rules
    // apply as on a real device.
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        let sampler = GeoSampler::start(
            FixedLocationSource::new(GeoPoint::new(lat, lng), 30.0),
            SamplerPolicy::student(),
        );
        let locked = sampler
            .wait_for_lock()
            .await
            .map_err(rollcall_core::CoreError::from)?;
        sampler.stop();

        if let Some(point) = locked.point {
            if let Some(verdict) = verifier.geofence_feedback(point) {
                if !global.quiet {
                    if verdict.inside {
                        eprintln!(
                            "You are inside the venue area ({:.0} m from center)",
                            verdict.distance_m
                        );
                    } else {
                        eprintln!(
                            "Warning: you appear to be outside the venue area ({:.0} m from center)",
                            verdict.distance_m
                        );
                    }
                }
            }
        }
    }

    let attempt = verifier.run(PastedTokenSource::new(token)).await?;

    if global.output == OutputFormat::Json {
        output::print_json(&serde_json::json!({
            "token": attempt.token,
            "submittedAt": attempt.submitted_at,
            "outcome": format!("{:?}", attempt.outcome),
            "message": attempt.message,
        }))?;
    }

    match attempt.outcome {
        ScanOutcome::Accepted => {
            if global.output == OutputFormat::Text {
                println!("{} {}", "marked:".green().bold(), attempt.message);
            }
            Ok(())
        }
        ScanOutcome::Expired => Err(CliError::SessionExpired {
            message: attempt.message,
        }),
        ScanOutcome::Invalid => Err(CliError::SessionNotFound),
        ScanOutcome::Offline => Err(CliError::Offline {
            detail: attempt.message,
        }),
        ScanOutcome::Failed => Err(CliError::Rejected {
            message: attempt.message,
            code: None,
        }),
    }
}

/// Accept either a bare token or a full attend-URL.
fn extract_token(scanned: &str) -> &str {
    scanned
        .split_once("token=")
        .map_or(scanned, |(_, rest)| rest.split('&').next().unwrap_or(rest))
}

#[cfg(test)]
mod tests {
    use super::extract_token;

    #[test]
    fn bare_token_passes_through() {
        assert_eq!(extract_token("abc123"), "abc123");
    }

    #[test]
    fn attend_url_yields_token() {
        assert_eq!(
            extract_token("https://a.example/attend?token=abc123"),
            "abc123"
        );
    }

    #[test]
    fn trailing_query_params_are_dropped() {
        assert_eq!(
            extract_token("https://a.example/attend?token=abc123&utm=x"),
            "abc123"
        );
    }
}
