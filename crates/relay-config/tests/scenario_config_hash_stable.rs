//! Config hash stability across key reordering, merge layering, and reloads.

use relay_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
global:
  min_interval_minutes: 5
  limit: 100
sources:
  - id: "s1"
    platform: "mastodon"
    target:
      account_id: "acct1"
    priority: "high"
"#;

/// Same content as BASE_YAML but with keys in a different order.
const BASE_YAML_REORDERED: &str = r#"
sources:
  - target:
      account_id: "acct1"
    platform: "mastodon"
    id: "s1"
    priority: "high"
global:
  limit: 100
  min_interval_minutes: 5
"#;

const OVERLAY_YAML: &str = r#"
global:
  limit: 200
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(original.config_hash, reordered.config_hash);
}

#[test]
fn merged_layers_override_and_produce_stable_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.config.global.limit, 200);
    assert_eq!(a.config.global.min_interval_minutes, 5);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn empty_config_parses_to_defaults() {
    let a = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let b = load_layered_yaml_from_strings(&["{}"]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert!(a.config.sources.is_empty());
}

#[test]
fn unrecognized_source_keys_are_carried_opaquely() {
    let yaml = r#"
sources:
  - id: "s1"
    platform: "mastodon"
    target:
      account_id: "acct1"
    some_future_field: "value"
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    assert_eq!(loaded.config.sources.len(), 1);
    assert!(loaded.config.sources[0].extra.contains_key("some_future_field"));
}
