//! Lecturer session command handlers.

use std::time::Duration;

use tracing::debug;

use rollcall_core::{
    ActiveSessionPoller, AttendanceSession, AttendanceSessionController, GeoPoint, SamplerPolicy,
    SessionOptions, SessionPhase,
};

use crate::cli::{GlobalOpts, OutputFormat, SessionArgs, SessionCommand, StartArgs};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::output;
use crate::sources::FixedLocationSource;

pub async fn handle(args: SessionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;

    match args.command {
        SessionCommand::Start(start_args) => start(&resolved, start_args, global).await,
        SessionCommand::Status { course } => status(&resolved, course.as_deref(), global).await,
        SessionCommand::End { course } => end(&resolved, course.as_deref(), global).await,
        SessionCommand::Watch {
            course,
            interval_secs,
        } => watch(&resolved, course.as_deref(), interval_secs, global).await,
    }
}

// ── start ───────────────────────────────────────────────────────────

async fn start(resolved: &Resolved, args: StartArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let client = resolved.lecturer_client(global)?;
    let course = resolved.course(args.course.as_deref())?;
    let defaults = resolved.session_defaults()?;

    let options = SessionOptions {
        duration: args
            .duration_secs
            .map_or(defaults.duration, Duration::from_secs),
        radius_m: args.radius_m.unwrap_or(defaults.radius_m),
        rotation_interval: defaults.rotation_interval,
        accuracy_clamp_m: defaults.accuracy_clamp_m,
    };

    let ctrl =
        AttendanceSessionController::new(client, course, SamplerPolicy::lecturer(), options);
    let source = FixedLocationSource::new(GeoPoint::new(args.lat, args.lng), args.accuracy_m);

    ctrl.start(source).await?;

    match ctrl.current_phase() {
        SessionPhase::Active => {
            if !global.quiet {
                eprintln!("Resuming the already-active session");
            }
        }
        SessionPhase::AwaitingLock => {
            if !global.quiet {
                eprintln!("Acquiring GPS lock...");
            }
            let lock = ctrl.wait_for_lock().await?;
            if !global.quiet {
                if let Some(accuracy) = lock.best_accuracy_m {
                    eprintln!("Locked at {accuracy:.0} m accuracy");
                }
            }
            ctrl.create().await?;
        }
        phase => {
            return Err(CliError::Internal(format!(
                "unexpected phase after start: {phase:?}"
            )))
        }
    }

    run_active(&ctrl, global).await
}

/// Display the rotating QR until expiry or Ctrl-C.
async fn run_active(
    ctrl: &AttendanceSessionController,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut qr = ctrl.qr_payload();
    let mut phase = ctrl.phase();

    if let Some(payload) = qr.borrow_and_update().clone() {
        output::render_qr(&payload, ctrl.seconds_remaining(), global.output);
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                if !global.quiet {
                    eprintln!("Ending session...");
                }
                let message = ctrl.end().await?;
                if !global.quiet {
                    eprintln!("{message}");
                }
                return Ok(());
            }
            changed = qr.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                if let Some(payload) = qr.borrow_and_update().clone() {
                    output::render_qr(&payload, ctrl.seconds_remaining(), global.output);
                }
            }
            changed = phase.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = *phase.borrow_and_update();
                debug!(?current, "session phase changed");
                if current == SessionPhase::Ended {
                    if !global.quiet {
                        eprintln!("Session ended");
                    }
                    return Ok(());
                }
            }
        }
    }
}

// ── status ──────────────────────────────────────────────────────────

async fn status(
    resolved: &Resolved,
    course: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = resolved.lecturer_client(global)?;
    let course = resolved.course(course)?;

    let session = client
        .active_session(&course)
        .await
        .map_err(rollcall_core::CoreError::from)
        .map_err(CliError::from)?
        .map(AttendanceSession::from);

    match (session, global.output) {
        (Some(s), OutputFormat::Json) => output::print_json(&output::session_json(&s)),
        (Some(s), OutputFormat::Text) => {
            println!("{}", output::session_line(&s));
            Ok(())
        }
        (None, OutputFormat::Json) => output::print_json(&serde_json::json!({ "active": false })),
        (None, OutputFormat::Text) => {
            println!("no active session for {course}");
            Ok(())
        }
    }
}

// ── end ─────────────────────────────────────────────────────────────

async fn end(
    resolved: &Resolved,
    course: Option<&str>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = resolved.lecturer_client(global)?;
    let course = resolved.course(course)?;

    let session = client
        .active_session(&course)
        .await
        .map_err(rollcall_core::CoreError::from)
        .map_err(CliError::from)?
        .ok_or(CliError::SessionNotFound)?;

    if !output::confirm(&format!("End the active session for {course}?"), global.yes)? {
        return Ok(());
    }

    let ack = client
        .end_session(&session.id)
        .await
        .map_err(rollcall_core::CoreError::from)
        .map_err(CliError::from)?;

    if !global.quiet {
        eprintln!("{}", ack.message);
    }
    Ok(())
}

// ── watch ───────────────────────────────────────────────────────────

async fn watch(
    resolved: &Resolved,
    course: Option<&str>,
    interval_secs: Option<u64>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = resolved.lecturer_client(global)?;
    let course = resolved.course(course)?;
    let every = interval_secs.map_or(resolved.session_defaults()?.poll_interval, Duration::from_secs);

    let poller = ActiveSessionPoller::start(client, course.clone(), every);
    let mut snapshots = poller.subscribe();

    if !global.quiet {
        eprintln!("Watching {course} (Ctrl-C to stop)");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                poller.stop();
                return Ok(());
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let snapshot = snapshots.borrow_and_update().clone();
                match (snapshot, global.output) {
                    (Some(s), OutputFormat::Json) => {
                        output::print_json(&output::session_json(&s))?;
                    }
                    (Some(s), OutputFormat::Text) => println!("{}", output::session_line(&s)),
                    (None, OutputFormat::Json) => {
                        output::print_json(&serde_json::json!({ "active": false }))?;
                    }
                    (None, OutputFormat::Text) => println!("no active session for {course}"),
                }
            }
        }
    }
}
