// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every problem instead of stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::ReeldataConfig;

pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &ReeldataConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.storage.busy_timeout_ms == 0 {
        errors.push(ConfigError::validation(
            "storage.busy_timeout_ms must be greater than zero",
        ));
    }

    for (key, value) in [
        ("transaction.max_wait_ms", config.transaction.max_wait_ms),
        ("transaction.timeout_ms", config.transaction.timeout_ms),
    ] {
        if value == 0 {
            errors.push(ConfigError::validation(format!(
                "{key} must be greater than zero"
            )));
        }
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        let hint = crate::diagnostic::suggest_key(&level, LOG_LEVELS)
            .map(|s| format!(" (did you mean `{s}`?)"))
            .unwrap_or_default();
        errors.push(ConfigError::validation(format!(
            "logging.level `{}` is not one of {}{hint}",
            config.logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&ReeldataConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ReeldataConfig::default();
        config.storage.database_path = "  ".into();
        config.transaction.timeout_ms = 0;
        config.logging.level = "verbose".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn log_level_typo_gets_hint() {
        let mut config = ReeldataConfig::default();
        config.logging.level = "debgu".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("did you mean `debug`"));
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = ReeldataConfig::default();
        config.logging.level = "WARN".into();
        assert!(validate_config(&config).is_ok());
    }
}
