//! JSON-file session record repository.
//!
//! Append-only history, one document per record at
//! `<base>/history/<user_id>/<record_id>.json`. A corrupt document is
//! skipped and logged during queries; it never fails the whole listing.

use crate::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use repose_core::error::{ReposeError, Result};
use repose_core::session::{RecordFeedback, SessionRecord, SessionRecordRepository};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// File-backed [`SessionRecordRepository`].
pub struct JsonSessionRecordRepository {
    base_dir: PathBuf,
}

impl JsonSessionRecordRepository {
    /// Creates a repository rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().join("history"),
        }
    }

    fn record_path(&self, user_id: &str, record_id: &str) -> Result<PathBuf> {
        validate_key(user_id, "user id")?;
        validate_key(record_id, "record id")?;
        Ok(self.base_dir.join(user_id).join(format!("{record_id}.json")))
    }

    // Tmp-file + rename so a crash mid-save cannot tear the document.
    fn write_record(&self, path: &Path, record: &SessionRecord) -> Result<()> {
        AtomicJsonFile::new(path.to_path_buf()).save(record)
    }

    async fn read_record(&self, path: &Path) -> Result<SessionRecord> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ReposeError::transient_store(format!("read {path:?}: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| ReposeError::parse(format!("decode {path:?}: {e}")))
    }

    /// Loads every readable record for a user, newest first.
    async fn load_all(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        validate_key(user_id, "user id")?;
        let user_dir = self.base_dir.join(user_id);
        let mut entries = match fs::read_dir(&user_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(ReposeError::transient_store(format!(
                    "read dir {user_dir:?}: {e}"
                )));
            }
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReposeError::transient_store(format!("scan {user_dir:?}: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_record(&path).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    // One bad document must not take down the whole query.
                    warn!(target: "history", "skipping unreadable record {path:?}: {e}");
                }
            }
        }
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }
}

#[async_trait]
impl SessionRecordRepository for JsonSessionRecordRepository {
    async fn append(&self, record: &SessionRecord) -> Result<()> {
        let path = self.record_path(&record.user_id, &record.id)?;
        match fs::try_exists(&path).await {
            Ok(true) => Err(ReposeError::validation(format!(
                "record '{}' already exists",
                record.id
            ))),
            Ok(false) => self.write_record(&path, record),
            Err(e) => Err(ReposeError::transient_store(format!("stat {path:?}: {e}"))),
        }
    }

    async fn update_feedback(
        &self,
        user_id: &str,
        record_id: &str,
        feedback: &RecordFeedback,
    ) -> Result<()> {
        feedback.validate()?;
        let path = self.record_path(user_id, record_id)?;
        match fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => return Err(ReposeError::not_found("SessionRecord", record_id)),
            Err(e) => {
                return Err(ReposeError::transient_store(format!("stat {path:?}: {e}")));
            }
        }
        let mut record = self.read_record(&path).await?;
        record.rating = feedback.rating;
        record.notes = feedback.notes.clone();
        self.write_record(&path, &record)
    }

    async fn delete(&self, user_id: &str, record_id: &str) -> Result<()> {
        let path = self.record_path(user_id, record_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ReposeError::not_found("SessionRecord", record_id))
            }
            Err(e) => Err(ReposeError::transient_store(format!(
                "delete {path:?}: {e}"
            ))),
        }
    }

    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>> {
        let mut records = self.load_all(user_id).await?;
        records.truncate(limit);
        Ok(records)
    }

    async fn by_practice(&self, user_id: &str, practice_id: &str) -> Result<Vec<SessionRecord>> {
        let records = self.load_all(user_id).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.practice_id.as_deref() == Some(practice_id))
            .collect())
    }

    async fn completed_only(&self, user_id: &str) -> Result<Vec<SessionRecord>> {
        let records = self.load_all(user_id).await?;
        Ok(records.into_iter().filter(|r| r.completed).collect())
    }

    async fn count_on(&self, user_id: &str, date: NaiveDate) -> Result<usize> {
        let records = self.load_all(user_id).await?;
        Ok(records
            .iter()
            .filter(|r| r.started_at.date_naive() == date)
            .count())
    }

    async fn count_in_week_of(
        &self,
        user_id: &str,
        date: NaiveDate,
        week_start: Weekday,
    ) -> Result<usize> {
        let offset = (date.weekday().num_days_from_monday() + 7
            - week_start.num_days_from_monday())
            % 7;
        let start = date - Days::new(u64::from(offset));
        let end = start + Days::new(7);
        let records = self.load_all(user_id).await?;
        Ok(records
            .iter()
            .filter(|r| {
                let day = r.started_at.date_naive();
                day >= start && day < end
            })
            .count())
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
