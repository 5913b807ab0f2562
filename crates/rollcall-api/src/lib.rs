// rollcall-api: Async Rust client for the rollcall attendance-session API

pub mod client;
pub mod error;
pub mod transport;
pub mod types;

pub use client::AttendanceClient;
pub use error::Error;
pub use transport::TransportConfig;
