//! JSON-file checkpoint repository.
//!
//! One document per `(user, practice)` key at
//! `<base>/checkpoints/<user_id>/<practice_id>.json`. Saves are
//! unconditional overwrites (last-write-wins); an unreadable document is
//! treated as missing rather than failing the caller, matching the
//! fail-soft restore policy.

use crate::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use repose_core::clock::Clock;
use repose_core::error::{ReposeError, Result};
use repose_core::session::{Checkpoint, CheckpointRepository, CheckpointSnapshot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::warn;

/// File-backed [`CheckpointRepository`].
pub struct JsonCheckpointRepository {
    base_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl JsonCheckpointRepository {
    /// Creates a repository rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_dir: base_dir.as_ref().join("checkpoints"),
            clock,
        }
    }

    fn checkpoint_path(&self, user_id: &str, practice_id: &str) -> Result<PathBuf> {
        validate_key(user_id, "user id")?;
        validate_key(practice_id, "practice id")?;
        Ok(self
            .base_dir
            .join(user_id)
            .join(format!("{practice_id}.json")))
    }
}

#[async_trait]
impl CheckpointRepository for JsonCheckpointRepository {
    async fn save(
        &self,
        user_id: &str,
        practice_id: &str,
        snapshot: &CheckpointSnapshot,
    ) -> Result<()> {
        let path = self.checkpoint_path(user_id, practice_id)?;
        let checkpoint = Checkpoint {
            user_id: user_id.to_string(),
            practice_id: practice_id.to_string(),
            snapshot: snapshot.clone(),
            saved_at: self.clock.now(),
        };
        // Tmp-file + rename so a crash mid-save cannot tear the document.
        AtomicJsonFile::new(path).save(&checkpoint)
    }

    async fn load(&self, user_id: &str, practice_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.checkpoint_path(user_id, practice_id)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ReposeError::transient_store(format!("read {path:?}: {e}")));
            }
        };
        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(checkpoint) => Ok(Some(checkpoint)),
            Err(e) => {
                // An undecodable checkpoint is not worth failing a resume
                // over; the session simply starts fresh.
                warn!(target: "checkpoint", "discarding unreadable checkpoint {path:?}: {e}");
                Ok(None)
            }
        }
    }

    async fn delete(&self, user_id: &str, practice_id: &str) -> Result<()> {
        let path = self.checkpoint_path(user_id, practice_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ReposeError::transient_store(format!(
                "delete {path:?}: {e}"
            ))),
        }
    }

    async fn cleanup_older_than(&self, ttl: Duration) -> Result<usize> {
        let ttl = ChronoDuration::from_std(ttl)
            .map_err(|e| ReposeError::validation(format!("ttl out of range: {e}")))?;
        let cutoff = self.clock.now() - ttl;

        let mut users = match fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(ReposeError::transient_store(format!(
                    "read dir {:?}: {e}",
                    self.base_dir
                )));
            }
        };

        let mut removed = 0;
        while let Some(user_entry) = users
            .next_entry()
            .await
            .map_err(|e| ReposeError::transient_store(format!("scan checkpoints: {e}")))?
        {
            let is_dir = user_entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            let mut files = match fs::read_dir(user_entry.path()).await {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(target: "checkpoint", "skipping {:?} during cleanup: {e}", user_entry.path());
                    continue;
                }
            };
            while let Some(file_entry) = files
                .next_entry()
                .await
                .map_err(|e| ReposeError::transient_store(format!("scan checkpoints: {e}")))?
            {
                let path = file_entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let checkpoint: Checkpoint = match fs::read_to_string(&path)
                    .await
                    .map_err(|e| e.to_string())
                    .and_then(|c| serde_json::from_str(&c).map_err(|e| e.to_string()))
                {
                    Ok(checkpoint) => checkpoint,
                    Err(e) => {
                        warn!(target: "checkpoint", "skipping unreadable {path:?} during cleanup: {e}");
                        continue;
                    }
                };
                if checkpoint.saved_at < cutoff {
                    match fs::remove_file(&path).await {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            warn!(target: "checkpoint", "failed to remove {path:?}: {e}");
                        }
                    }
                }
            }
        }
        Ok(removed)
    }
}

fn validate_key(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ReposeError::validation(format!("{what} must not be blank")));
    }
    if value.contains(['/', '\\']) || value.contains("..") {
        return Err(ReposeError::validation(format!(
            "{what} contains path separators"
        )));
    }
    Ok(())
}
