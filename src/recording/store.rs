//! Recording persistence
//!
//! One JSON file per recording under the configured directory, named by
//! recording id. Listing tolerates unreadable files so one corrupt
//! recording does not hide the rest.

use crate::recording::types::ActionRecording;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File-backed recording store
#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub async fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Persist a recording, overwriting any previous version
    pub async fn save(&self, recording: &ActionRecording) -> Result<()> {
        let path = self.path_for(&recording.id);
        let json = serde_json::to_string_pretty(recording)?;
        tokio::fs::write(&path, json).await?;
        debug!("Saved recording {} to {}", recording.id, path.display());
        Ok(())
    }

    /// Load a recording by id
    pub async fn load(&self, id: &str) -> Result<ActionRecording> {
        let path = self.path_for(id);
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| Error::recording_not_found(id))?;
        serde_json::from_str(&json)
            .map_err(|e| Error::internal(format!("Recording {} is corrupt: {}", id, e)))
    }

    /// List all readable recordings, newest first
    pub async fn list(&self) -> Result<Vec<ActionRecording>> {
        let mut recordings = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(json) => match serde_json::from_str::<ActionRecording>(&json) {
                    Ok(recording) => recordings.push(recording),
                    Err(e) => warn!("Skipping unreadable recording {}: {}", path.display(), e),
                },
                Err(e) => warn!("Skipping unreadable recording {}: {}", path.display(), e),
            }
        }

        recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(recordings)
    }

    /// Delete a recording. Deleting an absent recording is not an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
