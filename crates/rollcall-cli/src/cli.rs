//! Clap definitions: global options and the command tree.

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Geofenced attendance sessions with rotating QR tokens",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile name from the config file.
    #[arg(long, short = 'p', global = true, env = "ROLLCALL_PROFILE")]
    pub profile: Option<String>,

    /// Attendance server base URL (bypasses profiles).
    #[arg(long, global = true, env = "ROLLCALL_SERVER")]
    pub server: Option<String>,

    /// Bearer token for lecturer commands.
    #[arg(long, global = true, env = "ROLLCALL_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format.
    #[arg(long, short = 'o', global = true, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Assume yes for confirmation prompts.
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lecturer session lifecycle (start, status, end, watch).
    Session(SessionArgs),

    /// Mark attendance for a scanned QR token or attend-URL.
    Scan(ScanArgs),

    /// Manage configuration profiles.
    Config(ConfigArgs),
}

// ── session ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Start a session: acquire a GPS lock, create the session, and
    /// keep the rotating QR on screen until expiry or Ctrl-C.
    Start(StartArgs),

    /// Show the course's active session, if any.
    Status {
        /// Course identifier (defaults to the profile's course).
        #[arg(long)]
        course: Option<String>,
    },

    /// End the course's active session.
    End {
        #[arg(long)]
        course: Option<String>,
    },

    /// Poll the course's active session and print changes.
    Watch {
        #[arg(long)]
        course: Option<String>,

        /// Poll cadence in seconds.
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

#[derive(Debug, Args)]
pub struct StartArgs {
    /// Course identifier (defaults to the profile's course).
    #[arg(long)]
    pub course: Option<String>,

    /// Venue latitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Venue longitude in degrees.
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,

    /// Reported GPS accuracy in metres.
    #[arg(long, default_value_t = 40.0)]
    pub accuracy_m: f64,

    /// Session duration in seconds (overrides config).
    #[arg(long)]
    pub duration_secs: Option<u64>,

    /// Geofence radius in metres (overrides config).
    #[arg(long)]
    pub radius_m: Option<f64>,
}

// ── scan ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// The scanned value: either a bare token or a full attend-URL.
    pub token: String,

    /// Your latitude, for local geofence feedback.
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    pub lat: Option<f64>,

    /// Your longitude, for local geofence feedback.
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lng: Option<f64>,
}

// ── config ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create or update a profile.
    Init {
        /// Attendance server base URL.
        #[arg(long)]
        server: String,

        /// Default course for lecturer commands.
        #[arg(long)]
        course: Option<String>,

        /// Profile name to create or update.
        #[arg(long, default_value = "default")]
        name: String,
    },

    /// Print the effective configuration as TOML.
    Show,

    /// Print the config file path.
    Path,
}
