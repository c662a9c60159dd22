//! A fixture-backed `UpstreamSource` for tests and dry runs.
//!
//! Items are supplied up front (in memory, or loaded from a JSON file by the
//! caller) rather than fetched over the network. Each call to `fetch`
//! returns the fixed item list; callers that want incremental delivery
//! across repeated calls should build several fixtures and swap between
//! them per run.

use async_trait::async_trait;
use relay_schemas::UniformPost;

use crate::{ProviderError, UpstreamSource};

pub struct FixtureSource {
    source_id: String,
    items: Vec<UniformPost>,
}

impl FixtureSource {
    pub fn new(source_id: impl Into<String>, items: Vec<UniformPost>) -> Self {
        Self {
            source_id: source_id.into(),
            items,
        }
    }

    /// Build a fixture from a JSON array of `UniformPost` values, the shape
    /// scenario tests and dry-run fixtures ship on disk.
    pub fn from_json(source_id: impl Into<String>, json: &str) -> Result<Self, ProviderError> {
        let items: Vec<UniformPost> =
            serde_json::from_str(json).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(Self::new(source_id, items))
    }
}

#[async_trait]
impl UpstreamSource for FixtureSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    async fn fetch(&self) -> Result<Vec<UniformPost>, ProviderError> {
        Ok(self.items.clone())
    }
}
