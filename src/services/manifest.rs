//! In-memory cache for Bungie manifest definition lookups.

use crate::services::BungieClient;
use dashmap::DashMap;
use std::sync::Arc;

pub const DEF_MILESTONE: &str = "DestinyMilestoneDefinition";
pub const DEF_ACTIVITY: &str = "DestinyActivityDefinition";
pub const DEF_CLASS: &str = "DestinyClassDefinition";
pub const DEF_RACE: &str = "DestinyRaceDefinition";
pub const DEF_GENDER: &str = "DestinyGenderDefinition";

/// Hash-to-name cache over the manifest endpoint.
///
/// Definitions are immutable for the life of a manifest version, so
/// entries are never evicted. Lookup failures degrade to
/// `"Unknown (<hash>)"` and are never propagated; a missing display name
/// must not fail an update cycle.
pub struct ManifestCache {
    client: Arc<BungieClient>,
    cache: DashMap<(String, String), String>,
}

impl ManifestCache {
    pub fn new(client: Arc<BungieClient>) -> Self {
        Self {
            client,
            cache: DashMap::new(),
        }
    }

    /// Resolve a definition hash to its display name.
    pub async fn display_name(&self, definition_type: &str, hash: &str) -> String {
        let key = (definition_type.to_string(), hash.to_string());
        if let Some(name) = self.cache.get(&key) {
            return name.clone();
        }

        match self.client.get_manifest_definition(definition_type, hash).await {
            Ok(definition) => {
                let name = definition
                    .display_properties
                    .and_then(|props| props.name)
                    .unwrap_or_else(|| format!("Unknown ({})", hash));
                self.cache.insert(key, name.clone());
                name
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    definition_type,
                    hash,
                    "Manifest lookup failed"
                );
                format!("Unknown ({})", hash)
            }
        }
    }

    /// Number of cached definitions (debug logging).
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
