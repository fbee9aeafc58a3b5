use super::{PatternStore, rank};
use async_trait::async_trait;
use mender_common::error::StoreError;
use mender_common::pattern::{LearnedPattern, PatternFilter, PatternId, PatternQuery, ScoredPattern};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Append-only JSON-lines file. One pattern per line; the id is the line
/// number (1-based).
pub struct FilePatternStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FilePatternStore {
    /// Open (or create) a store at `path`, creating parent directories.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// `~/.mender/patterns.jsonl`, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".mender").join("patterns.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every parseable line, paired with its line-number id.
    pub async fn load(&self) -> Result<Vec<(PatternId, LearnedPattern)>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut patterns = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LearnedPattern>(line) {
                Ok(pattern) => patterns.push((index as PatternId + 1, pattern)),
                Err(e) => warn!(
                    "Skipping malformed pattern at {}:{}: {}",
                    self.path.display(),
                    index + 1,
                    e
                ),
            }
        }
        Ok(patterns)
    }

    async fn line_count(&self) -> Result<usize, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.lines().count()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PatternStore for FilePatternStore {
    async fn store(&self, pattern: LearnedPattern) -> Result<PatternId, StoreError> {
        if pattern.selector.trim().is_empty() {
            return Err(StoreError::InvalidPattern("empty selector".into()));
        }
        let mut line = serde_json::to_string(&pattern)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let id = self.line_count().await? as PatternId + 1;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(id)
    }

    async fn find_similar(
        &self,
        query: &PatternQuery,
        limit: usize,
        filter: &PatternFilter,
    ) -> Result<Vec<ScoredPattern>, StoreError> {
        let patterns = self.load().await?;
        rank(
            patterns.iter().map(|(id, p)| (*id, p)),
            query,
            limit,
            filter,
        )
    }
}
