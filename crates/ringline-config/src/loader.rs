// SPDX-FileCopyrightText: 2026 Ringline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! `./ringline.toml` > `~/.config/ringline/ringline.toml` > `/etc/ringline/ringline.toml`,
//! with `RINGLINE_*` environment variables overriding every file.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::RinglineConfig;

/// Top-level sections, used to map `RINGLINE_<SECTION>_<KEY>` onto `section.key`.
const SECTIONS: [&str; 5] = ["server", "storage", "calls", "logging", "metrics"];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/ringline/ringline.toml";
pub(crate) const LOCAL_CONFIG: &str = "ringline.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("ringline/ringline.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ringline/ringline.toml`
/// 3. `~/.config/ringline/ringline.toml`
/// 4. `./ringline.toml`
/// 5. `RINGLINE_*` environment variables
pub fn load_config() -> Result<RinglineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RinglineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RinglineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RinglineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RinglineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RinglineConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Maps only the first underscore after the section name, so
/// `RINGLINE_SERVER_BEARER_TOKEN` lands on `server.bearer_token`.
fn env_provider() -> Env {
    Env::prefixed("RINGLINE_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("server_bearer_token"), "server.bearer_token");
        assert_eq!(
            map_env_key("calls_reconnect_grace_ms"),
            "calls.reconnect_grace_ms"
        );
        assert_eq!(map_env_key("storage_wal_mode"), "storage.wal_mode");
        assert_eq!(map_env_key("unrelated"), "unrelated");
    }
}
