pub mod client;
pub mod config;
pub mod errors;
pub mod events;
pub mod tag;

pub use client::{Position, TrackingClient};
pub use config::{BridgeConfig, ConfigError};
pub use errors::{ReconcileError, RemoteError};
pub use tag::OriginTag;
