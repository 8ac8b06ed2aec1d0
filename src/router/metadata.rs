//! Static-but-overridable model metadata table.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{McpError, Result};
use crate::types::{ModelId, ModelMetadata, ModelMetadataOverride};

/// Embedded seed data, grounded in the teacher's registry's embedded-seed
/// loading pattern (`include_str!` + `serde_json` rather than a network
/// fetch at startup).
const SEED_JSON: &str = include_str!("seed.json");

/// Read-mostly table of every known model's metadata. Updates go through
/// `override_model`, which takes a writer lock and replaces an entry
/// atomically from the selector's point of view (spec §5).
pub struct MetadataTable {
    entries: RwLock<HashMap<ModelId, ModelMetadata>>,
}

impl MetadataTable {
    /// Load the embedded seed data.
    pub fn with_embedded_seed() -> Result<Self> {
        let raw: HashMap<String, ModelMetadata> = serde_json::from_str(SEED_JSON)?;
        let entries = raw
            .into_iter()
            .map(|(id, meta)| (ModelId::new(id), meta))
            .collect();
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: &ModelId) -> Option<ModelMetadata> {
        self.entries
            .read()
            .expect("metadata table lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn insert(&self, id: ModelId, metadata: ModelMetadata) {
        self.entries
            .write()
            .expect("metadata table lock poisoned")
            .insert(id, metadata);
    }

    /// Apply a partial override to an existing model, or error if the model
    /// is unknown (callers must seed a model before overriding it).
    pub fn override_model(&self, id: &ModelId, partial: &ModelMetadataOverride) -> Result<()> {
        let mut entries = self.entries.write().expect("metadata table lock poisoned");
        let existing = entries
            .get_mut(id)
            .ok_or_else(|| McpError::ConfigError(format!("unknown model: {id}")))?;
        partial.apply(existing);
        Ok(())
    }

    pub fn all(&self) -> Vec<(ModelId, ModelMetadata)> {
        self.entries
            .read()
            .expect("metadata table lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("metadata table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderId;
    use std::collections::HashMap as Map;

    fn sample() -> ModelMetadata {
        ModelMetadata {
            provider: ProviderId::Claude,
            context_size: 100_000,
            cost_per_input_token: 0.000003,
            cost_per_output_token: 0.000015,
            average_response_time_ms: 1000.0,
            capabilities: Map::new(),
        }
    }

    #[test]
    fn embedded_seed_loads_and_is_nonempty() {
        let table = MetadataTable::with_embedded_seed().unwrap();
        assert!(!table.is_empty());
    }

    #[test]
    fn insert_then_get_round_trips() {
        let table = MetadataTable::empty();
        let id = ModelId::new("test-model");
        table.insert(id.clone(), sample());
        assert!(table.get(&id).is_some());
    }

    #[test]
    fn override_unknown_model_errors() {
        let table = MetadataTable::empty();
        let id = ModelId::new("missing");
        let result = table.override_model(&id, &ModelMetadataOverride::default());
        assert!(result.is_err());
    }

    #[test]
    fn override_applies_partial_fields() {
        let table = MetadataTable::empty();
        let id = ModelId::new("test-model");
        table.insert(id.clone(), sample());
        let partial = ModelMetadataOverride {
            cost_per_input_token: Some(0.000001),
            ..Default::default()
        };
        table.override_model(&id, &partial).unwrap();
        let updated = table.get(&id).unwrap();
        assert_eq!(updated.cost_per_input_token, 0.000001);
        assert_eq!(updated.context_size, 100_000);
    }
}
