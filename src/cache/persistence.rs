//! Optional durable mirror for the exact cache.
//!
//! Disabling persistence must not change cache semantics, only whether
//! entries survive a process restart (spec §4.4).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Response;

/// Current on-disk schema version. Bumped whenever the envelope shape
/// changes in a way old readers can't tolerate.
pub const SCHEMA_VERSION: u32 = 1;

/// One durable entry: enough to reconstruct an `ExactCacheEntry` on load,
/// expressed with serializable timestamps (`ExactCacheEntry` itself uses
/// `Instant`, which has no absolute meaning across a restart).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub key_hash: u64,
    pub response: Response,
    pub expires_at_unix_ms: u64,
}

/// Versioned envelope written to the backing store, namespaced per cache
/// instance (spec §6, "an opaque blob per cache namespace").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedEnvelope {
    pub version: u32,
    pub namespace: String,
    pub entries: Vec<PersistedEntry>,
}

/// Durable mirror for the exact cache. Implementations must tolerate
/// unknown fields and a schema mismatch by returning an empty cache rather
/// than erroring (spec §6, "on schema mismatch, the cache starts empty").
pub trait PersistentStore: Send + Sync {
    fn load(&self, namespace: &str) -> Result<Vec<PersistedEntry>>;
    fn save(&self, namespace: &str, entries: &[PersistedEntry]) -> Result<()>;
}

/// Default store: persistence disabled. `load` always returns empty,
/// `save` is a no-op — the cache behaves exactly as it would with no
/// durable mirror at all.
#[derive(Debug, Default)]
pub struct NullStore;

impl PersistentStore for NullStore {
    fn load(&self, _namespace: &str) -> Result<Vec<PersistedEntry>> {
        Ok(Vec::new())
    }

    fn save(&self, _namespace: &str, _entries: &[PersistedEntry]) -> Result<()> {
        Ok(())
    }
}

/// JSON file-backed store, one file per namespace under `dir`. Grounded in
/// the teacher's file-based cache-with-version pattern for cached registry
/// lookups.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }
}

impl PersistentStore for FileStore {
    fn load(&self, namespace: &str) -> Result<Vec<PersistedEntry>> {
        let path = self.path_for(namespace);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(crate::error::McpError::ConfigError(err.to_string())),
        };
        let envelope: PersistedEnvelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) => return Ok(Vec::new()),
        };
        if envelope.version != SCHEMA_VERSION {
            return Ok(Vec::new());
        }
        Ok(envelope.entries)
    }

    fn save(&self, namespace: &str, entries: &[PersistedEntry]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|err| crate::error::McpError::ConfigError(err.to_string()))?;
        let envelope = PersistedEnvelope {
            version: SCHEMA_VERSION,
            namespace: namespace.to_string(),
            entries: entries.to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&envelope)?;
        std::fs::write(self.path_for(namespace), bytes)
            .map_err(|err| crate::error::McpError::ConfigError(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelId, Savings, Source, Usage};

    fn sample_entry() -> PersistedEntry {
        PersistedEntry {
            key_hash: 42,
            response: Response {
                text: "hi".into(),
                model: ModelId::new("m"),
                provider: Some(crate::types::ProviderId::Claude),
                usage: Usage::default(),
                parsed_data: None,
                processing_time_ms: 1.0,
                source: Source::Provider,
                similarity: None,
                savings: Savings::default(),
                success: true,
                error: None,
            },
            expires_at_unix_ms: 0,
        }
    }

    #[test]
    fn null_store_round_trips_to_empty() {
        let store = NullStore;
        store.save("ns", &[sample_entry()]).unwrap();
        assert!(store.load("ns").unwrap().is_empty());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save("ns", &[sample_entry()]).unwrap();
        let loaded = store.load("ns").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].key_hash, 42);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load("absent").unwrap().is_empty());
    }

    #[test]
    fn file_store_schema_mismatch_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ns.json"),
            r#"{"version":9999,"namespace":"ns","entries":[]}"#,
        )
        .unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load("ns").unwrap().is_empty());
    }
}
