//! Environment-variable credential resolution.
//!
//! Config YAML stores only env var **names** (e.g. `target.token_env:
//! "RELAY_MASTODON_TOKEN"`); the actual value is read once at startup and
//! never scattered through `std::env::var` calls elsewhere. `Debug` on
//! [`ResolvedSecrets`] redacts every value.

use anyhow::{bail, Result};
use std::collections::HashMap;

use crate::types::RelayConfig;

/// Bearer tokens resolved per source id, keyed by `SourceConfig::id`.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub tokens: HashMap<String, String>,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field(
                "tokens",
                &self
                    .tokens
                    .keys()
                    .map(|k| (k.clone(), "<REDACTED>"))
                    .collect::<HashMap<_, _>>(),
            )
            .finish()
    }
}

impl ResolvedSecrets {
    pub fn token_for(&self, source_id: &str) -> Option<&str> {
        self.tokens.get(source_id).map(|s| s.as_str())
    }
}

fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Resolve a bearer token for every *enabled* source that declares a
/// `target.token_env`. A disabled source with a missing token is not an
/// error — it will never be scheduled.
pub fn resolve_secrets(config: &RelayConfig) -> Result<ResolvedSecrets> {
    let mut tokens = HashMap::new();
    for source in &config.sources {
        let Some(var_name) = &source.target.token_env else {
            continue;
        };
        match resolve_env(var_name) {
            Some(v) => {
                tokens.insert(source.id.clone(), v);
            }
            None if source.enabled => {
                bail!(
                    "SECRETS_MISSING source={}: required env var '{}' is not set or empty",
                    source.id,
                    var_name,
                );
            }
            None => {}
        }
    }
    Ok(ResolvedSecrets { tokens })
}
