// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./reeldata.toml` > `~/.config/reeldata/reeldata.toml`
//! > `/etc/reeldata/reeldata.toml` with environment variable overrides via the
//! `REELDATA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ReeldataConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/reeldata/reeldata.toml";
pub(crate) const LOCAL_CONFIG: &str = "reeldata.toml";

pub(crate) fn user_config() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("reeldata/reeldata.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/reeldata/reeldata.toml` (system-wide)
/// 3. `~/.config/reeldata/reeldata.toml` (user XDG config)
/// 4. `./reeldata.toml` (local directory)
/// 5. `REELDATA_*` environment variables
pub fn load_config() -> Result<ReeldataConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ReeldataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReeldataConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ReeldataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ReeldataConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ReeldataConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps `REELDATA_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `REELDATA_STORAGE_DATABASE_PATH` is `storage.database_path`.
fn env_provider() -> Env {
    Env::prefixed("REELDATA_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("storage_", "storage.", 1)
            .replacen("transaction_", "transaction.", 1)
            .replacen("logging_", "logging.", 1);
        mapped.into()
    })
}

/// Renders the compiled defaults as a TOML document.
pub fn default_config_toml() -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(&ReeldataConfig::default())
}
