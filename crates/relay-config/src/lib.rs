//! Layered YAML configuration loading, canonicalization, and hashing.
//!
//! Configuration is read-only to the core: the core never writes
//! config back, and unrecognized keys are carried opaquely rather than
//! rejected. See [`consumption`] for the companion "did we read everything
//! we expected to" hygiene pass, and [`secrets`] for environment-variable
//! credential resolution.

pub mod consumption;
pub mod secrets;
pub mod types;

pub use types::{
    FilteringConfig, GlobalConfig, Priority, RelayConfig, SourceConfig, TargetConfig,
    ThreadHandlingConfig, ThreadHandlingMode,
};

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: RelayConfig,
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut sources = Vec::with_capacity(paths.len());
    for p in paths {
        sources.push(fs::read_to_string(p).with_context(|| format!("read config: {p}"))?);
    }
    let borrowed: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&borrowed)
}

/// Same merge/canonicalize/hash pipeline as [`load_layered_yaml`], but over
/// in-memory YAML documents rather than file paths. Used directly by tests
/// that want to exercise hashing/merge determinism without touching disk.
pub fn load_layered_yaml_from_strings(layers: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for (i, s) in layers.iter().enumerate() {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(s).with_context(|| format!("parse yaml layer {i}"))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());

    let config_json: Value =
        serde_json::from_str(&canonical).context("canonical json parse failed")?;
    let config: RelayConfig =
        serde_json::from_value(config_json.clone()).context("config does not match schema")?;

    Ok(LoadedConfig {
        config,
        config_json,
        canonical_json: canonical,
        config_hash: hash,
    })
}

/// Deep-merge: objects merge recursively; arrays and scalars are replaced
/// wholesale by the later source.
fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// Canonicalize JSON by sorting all object keys recursively and emitting
/// compact JSON, so `config_hash` is stable across re-reads of semantically
/// identical files.
fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_merge_overrides_scalars_and_merges_objects() {
        let mut base = serde_json::json!({"a": 1, "nested": {"x": 1, "y": 2}});
        let overlay = serde_json::json!({"a": 2, "nested": {"y": 3, "z": 4}});
        deep_merge(&mut base, overlay);
        assert_eq!(
            base,
            serde_json::json!({"a": 2, "nested": {"x": 1, "y": 3, "z": 4}})
        );
    }

    #[test]
    fn canonical_json_is_stable_under_key_reordering() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        assert_eq!(canonicalize_json(&a), canonicalize_json(&b));
    }
}
