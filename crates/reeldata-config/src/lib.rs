// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Reeldata data-access layer.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, `REELDATA_*`
//! environment overrides, miette diagnostics with typo suggestions, and the
//! tracing subscriber setup driven by the `[logging]` section.
//!
//! # Usage
//!
//! ```no_run
//! use reeldata_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("database: {}", config.storage.database_path);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod telemetry;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{default_config_toml, load_config, load_config_from_path, load_config_from_str};
pub use model::{LogFormat, LoggingConfig, ReeldataConfig, StorageConfig, TransactionConfig};
pub use telemetry::init_tracing;

/// Loads configuration from the XDG hierarchy and validates it.
///
/// Figment errors are converted into diagnostics with source spans for any
/// TOML file that could be read.
pub fn load_and_validate() -> Result<ReeldataConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Loads configuration from a TOML string and validates it.
pub fn load_and_validate_str(toml_content: &str) -> Result<ReeldataConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = [("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

fn collect_toml_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|d| d.join(loader::LOCAL_CONFIG))
        .unwrap_or_else(|_| loader::LOCAL_CONFIG.into());
    [local, loader::user_config(), loader::SYSTEM_CONFIG.into()]
        .into_iter()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
