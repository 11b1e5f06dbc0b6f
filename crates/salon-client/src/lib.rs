//! # salon-client
//!
//! The top of the stack: session coordination (conversation switching, call
//! lifecycle), authentication and bootstrap, profile and server operations.
//! This crate is a library consumed by a presentation layer; it has no
//! executable surface.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod profile;
mod rows;
pub mod servers;

pub use config::ClientConfig;
pub use coordinator::SessionCoordinator;
pub use error::ClientError;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialise structured logging for the process.
///
/// Called once by the presentation layer before anything else; honours
/// `RUST_LOG` and falls back to a per-crate default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("salon_client=debug,salon_sync=debug,salon_store=info,salon_media=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::info!("Salon client core initialised");
}
