// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loads [`Config`], merging an optional TOML file with the handful of
//! `WARDEN_`-prefixed environment overrides kept for ergonomic
//! overrides of the most frequently tuned knobs.

use std::path::Path;
use warden_core::config::Config;

/// `--config FILE`, falling back to `~/.config/warden/config.toml`, then
/// to built-in defaults. A missing file at either location is not an
/// error; a malformed one is.
pub fn load(explicit_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = explicit_path
        .map(|p| p.to_path_buf())
        .or_else(default_config_path);

    let mut config = match path {
        Some(path) if path.exists() => {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| anyhow::anyhow!("reading config {}: {e}", path.display()))?;
            Config::from_toml_str(&contents)
                .map_err(|e| anyhow::anyhow!("parsing config {}: {e}", path.display()))?
        }
        _ => Config::default(),
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

fn default_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("warden").join("config.toml"))
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("WARDEN_CHECK_INTERVAL_MINUTES") {
        if let Ok(parsed) = v.parse() {
            config.check_interval_minutes = parsed;
        }
    }
    if let Ok(v) = std::env::var("WARDEN_TASK_COMPLETION_PATTERN") {
        config.task_completion_pattern = v;
    }
}
