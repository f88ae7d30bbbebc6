//! Configuration for the sluice forwarding proxy.
//!
//! The configuration is read once at startup and handed, immutable, to the
//! relay and gateway constructors.

pub mod error;
pub mod loader;
pub mod schema;
pub mod template;

pub use {
    error::{Error, Result},
    loader::{DEFAULT_CONFIG_FILE, load},
    schema::{BYTES_PER_MB, GuardConfig, LogConfig, LogFormat, ServerConfig, SluiceConfig},
    template::EXAMPLE_CONFIG,
};
