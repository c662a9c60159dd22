//! Command handler modules for `relay`.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod adapters;
pub mod run;
pub mod source;

use anyhow::Result;
use relay_config::consumption::{consumed_pointers, report_unused_keys, RunMode};
use relay_config::LoadedConfig;

/// Load + merge layered YAML config, then warn (never fail) about top-level
/// keys nothing in `mode` is wired to consume.
pub fn load_config(paths: &[String], mode: RunMode) -> Result<LoadedConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = relay_config::load_layered_yaml(&path_refs)?;

    let unused = report_unused_keys(&loaded.config_json, consumed_pointers(mode));
    for key in unused {
        tracing::warn!(key, "config key is not consumed by this run mode");
    }

    Ok(loaded)
}
