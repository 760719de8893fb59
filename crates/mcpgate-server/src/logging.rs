//! Logging initialization
//!
//! Logs go to stderr. `RUST_LOG` wins over the configured level when set.

use std::io;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

impl LoggingConfig {
    /// Install the global subscriber
    ///
    /// `verbosity` raises the level: 1 → `debug`, 2 or more → `trace`.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed.
    pub fn init(&self, verbosity: u8) -> io::Result<()> {
        let level = match verbosity {
            0 => self.level.as_str(),
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let subscriber = tracing_subscriber::registry().with(filter);

        if self.json {
            subscriber
                .with(fmt::layer().json().with_writer(io::stderr))
                .try_init()
                .map_err(|e| io::Error::other(e.to_string()))
        } else {
            subscriber
                .with(fmt::layer().with_writer(io::stderr))
                .try_init()
                .map_err(|e| io::Error::other(e.to_string()))
        }
    }
}
