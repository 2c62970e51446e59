//! Versioned crawl checkpoint persistence.

use std::path::{Path, PathBuf};

use campuscorpus_shared::{CURRENT_SCHEMA_VERSION, CheckpointSnapshot, CorpusError, Result};

use crate::entries::{ensure_parent, temp_sibling};

/// Reads and writes the checkpoint file.
///
/// Writes go to a temp file that is renamed over the target, so a crash
/// mid-write leaves the previous checkpoint intact. Only one process is
/// expected to write a given checkpoint path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot as pretty JSON.
    pub async fn save(&self, snapshot: &CheckpointSnapshot) -> Result<()> {
        ensure_parent(&self.path)
            .await
            .map_err(|e| CorpusError::Checkpoint(e.to_string()))?;

        let json = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| CorpusError::Checkpoint(format!("failed to encode checkpoint: {e}")))?;

        let tmp = temp_sibling(&self.path);
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| CorpusError::Checkpoint(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CorpusError::Checkpoint(format!("{}: {e}", self.path.display())))?;

        tracing::debug!(
            path = %self.path.display(),
            pages = snapshot.state.pages_processed,
            visited = snapshot.state.visited.len(),
            "checkpoint saved"
        );
        Ok(())
    }

    /// Load the last snapshot, or `None` if no checkpoint exists.
    ///
    /// A snapshot written by a newer schema is rejected.
    pub async fn load(&self) -> Result<Option<CheckpointSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CorpusError::Checkpoint(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };

        let snapshot: CheckpointSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
            CorpusError::Checkpoint(format!("{} is not a valid checkpoint: {e}", self.path.display()))
        })?;

        if snapshot.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(CorpusError::Checkpoint(format!(
                "schema_version {} is newer than supported version {}",
                snapshot.schema_version, CURRENT_SCHEMA_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    /// Delete the checkpoint. Returns whether a file was removed.
    pub async fn clear(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CorpusError::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campuscorpus_shared::{Fingerprint, FrontierState, RunId};
    use uuid::Uuid;

    fn test_store() -> CheckpointStore {
        CheckpointStore::new(
            std::env::temp_dir()
                .join(format!("cc-checkpoint-{}", Uuid::now_v7()))
                .join("crawl_checkpoint.json"),
        )
    }

    #[tokio::test]
    async fn missing_checkpoint_loads_none() {
        let store = test_store();
        assert!(store.load().await.expect("load").is_none());
        assert!(!store.clear().await.expect("clear"));
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let store = test_store();
        let mut state = FrontierState::default();
        state.visited.insert(Fingerprint::of("https://example.edu/a"));
        state.failed.insert(Fingerprint::of("https://example.edu/b"));
        state.pages_processed = 42;
        state.pending.push("https://example.edu/c".into());

        let run_id = RunId::new();
        store
            .save(&CheckpointSnapshot::new(&run_id, &state))
            .await
            .expect("save");

        let loaded = store.load().await.expect("load").expect("present");
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.run_id, Some(run_id));
        assert!(!temp_sibling(store.path()).exists());
    }

    #[tokio::test]
    async fn newer_schema_is_rejected() {
        let store = test_store();
        let mut snapshot = CheckpointSnapshot::new(&RunId::new(), &FrontierState::default());
        snapshot.schema_version = CURRENT_SCHEMA_VERSION + 1;
        store.save(&snapshot).await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, CorpusError::Checkpoint(_)));
        assert!(err.to_string().contains("newer"));
    }

    #[tokio::test]
    async fn corrupt_checkpoint_is_an_error() {
        let store = test_store();
        ensure_parent(store.path()).await.unwrap();
        tokio::fs::write(store.path(), b"{\"schema_version\": ").await.unwrap();
        assert!(store.load().await.is_err());
    }

    #[tokio::test]
    async fn clear_removes_file() {
        let store = test_store();
        store
            .save(&CheckpointSnapshot::new(&RunId::new(), &FrontierState::default()))
            .await
            .unwrap();
        assert!(store.clear().await.unwrap());
        assert!(store.load().await.unwrap().is_none());
    }
}
