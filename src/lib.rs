//! Macro Recorder - record and replay keyboard and mouse input.
//!
//! The library captures global input into timestamped sequences, persists
//! them as JSON files, and replays them with speed, repeat and loop controls.
//! Input is reached through the [`device::InputDevice`] trait so the core
//! runs the same against a native hook, a dry-run device, or a test fake.

pub mod capture;
pub mod commands;
pub mod config;
pub mod device;
pub mod error;
pub mod replay;
pub mod store;

pub use commands::MacroState;
pub use config::MacroConfig;
pub use error::{MacroError, MacroResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "macro_recorder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
