// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::diagnostic::ConfigError;
use crate::model::{LogFormat, LoggingConfig};

/// Filter directive used when `RUST_LOG` is not set.
pub fn default_directive(config: &LoggingConfig) -> String {
    format!("reeldata={},warn", config.level.to_ascii_lowercase())
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);

    let installed = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ConfigError::Other(format!("tracing subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_scopes_level_to_crate() {
        let config = LoggingConfig {
            level: "DEBUG".into(),
            format: LogFormat::Json,
        };
        assert_eq!(default_directive(&config), "reeldata=debug,warn");
    }
}
