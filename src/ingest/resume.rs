//! Resume tracking for interrupted ingest runs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::types::PipelineError;

/// Records which source documents have already been ingested so a rerun
/// can pick up where the last one stopped. State is a JSON list of
/// corpus-relative paths persisted beside the index.
#[derive(Clone, Debug)]
pub struct ResumeTracker {
    path: PathBuf,
    state: Arc<Mutex<HashSet<String>>>,
}

impl ResumeTracker {
    /// Creates a tracker persisting state to the provided path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Path the tracker persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads previously persisted state, if any.
    pub async fn load(&self) -> Result<(), PipelineError> {
        if !self.path.exists() {
            return Ok(());
        }
        let data = fs::read_to_string(&self.path).await?;
        let sources: Vec<String> = serde_json::from_str(&data)?;
        let mut guard = self.state.lock().await;
        guard.clear();
        guard.extend(sources);
        Ok(())
    }

    /// Returns `true` if the given source has already been ingested.
    pub async fn contains(&self, source: &str) -> bool {
        let guard = self.state.lock().await;
        guard.contains(source)
    }

    /// Marks a source as ingested and persists the updated state.
    pub async fn mark_processed(&self, source: &str) -> Result<(), PipelineError> {
        let mut guard = self.state.lock().await;
        let inserted = guard.insert(source.to_string());
        if !inserted && self.path.exists() {
            return Ok(());
        }
        let sources: Vec<String> = guard.iter().cloned().collect();
        drop(guard);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let serialized = serde_json::to_string(&sources)?;
        fs::write(&self.path, serialized).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn tracker_persists_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        let tracker = ResumeTracker::new(&path);
        tracker.load().await.unwrap();

        assert!(!tracker.contains("benefits/pension.html").await);

        tracker.mark_processed("benefits/pension.html").await.unwrap();
        assert!(tracker.contains("benefits/pension.html").await);

        let tracker_two = ResumeTracker::new(&path);
        tracker_two.load().await.unwrap();
        assert!(tracker_two.contains("benefits/pension.html").await);
        assert!(!tracker_two.contains("leave.html").await);
    }
}
