use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Queue of generated titles that have not been turned into videos yet.
///
/// Backed by a plain text file, one title per line. Consuming a title reads
/// the first non-empty line and rewrites the file without it, so state
/// survives between runs.
pub struct TitleQueue {
    path: PathBuf,
}

impl TitleQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append freshly generated titles to the end of the queue.
    pub async fn append(&self, titles: &[String]) -> Result<()> {
        if titles.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let existing = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        for title in titles {
            content.push_str(title);
            content.push('\n');
        }

        tokio::fs::write(&self.path, content).await?;
        debug!("Appended {} titles to {}", titles.len(), self.path.display());
        Ok(())
    }

    /// Take the first unused title, removing it from the queue file.
    /// Returns `None` when the queue is empty or does not exist yet.
    pub async fn pop_first(&self) -> Result<Option<String>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut lines = content.lines();
        let first = loop {
            match lines.next() {
                Some(line) if !line.trim().is_empty() => break line.trim().to_string(),
                Some(_) => continue,
                None => return Ok(None),
            }
        };

        let mut remainder: String = lines.collect::<Vec<_>>().join("\n");
        if !remainder.is_empty() {
            remainder.push('\n');
        }
        tokio::fs::write(&self.path, remainder).await?;

        Ok(Some(first))
    }

    /// Number of titles still waiting in the queue.
    pub async fn remaining(&self) -> Result<usize> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.lines().filter(|l| !l.trim().is_empty()).count()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

/// One generated script, paired with the title it was written for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub title: String,
    pub script: String,
}

/// Append-only JSON-lines log of every script the pipeline has produced.
pub struct ScriptLog {
    path: PathBuf,
}

impl ScriptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&self, entry: &ScriptEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read back every logged entry, newest last. Malformed lines are
    /// rejected rather than skipped.
    pub async fn entries(&self) -> Result<Vec<ScriptEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|e| anyhow!("corrupt script log entry: {e}"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_pop_from_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let queue = TitleQueue::new(dir.path().join("titles.txt"));
        assert_eq!(queue.pop_first().await.unwrap(), None);
        assert_eq!(queue.remaining().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_titles_pop_in_append_order() {
        let dir = TempDir::new().unwrap();
        let queue = TitleQueue::new(dir.path().join("titles.txt"));

        queue
            .append(&["First title".to_string(), "Second title".to_string()])
            .await
            .unwrap();
        queue.append(&["Third title".to_string()]).await.unwrap();
        assert_eq!(queue.remaining().await.unwrap(), 3);

        assert_eq!(queue.pop_first().await.unwrap().unwrap(), "First title");
        assert_eq!(queue.pop_first().await.unwrap().unwrap(), "Second title");
        assert_eq!(queue.pop_first().await.unwrap().unwrap(), "Third title");
        assert_eq!(queue.pop_first().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped_and_cleared() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("titles.txt");
        tokio::fs::write(&path, "\n\n  \nReal title\nNext\n")
            .await
            .unwrap();

        let queue = TitleQueue::new(&path);
        assert_eq!(queue.pop_first().await.unwrap().unwrap(), "Real title");
        assert_eq!(queue.pop_first().await.unwrap().unwrap(), "Next");
        assert_eq!(queue.pop_first().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_script_log_appends_and_reads_back() {
        let dir = TempDir::new().unwrap();
        let log = ScriptLog::new(dir.path().join("scripts.jsonl"));

        let first = ScriptEntry {
            title: "Stoic Mindset".to_string(),
            script: "Every setback is training.".to_string(),
        };
        let second = ScriptEntry {
            title: "Mental Toughness".to_string(),
            script: "What would you endure for growth?".to_string(),
        };

        log.append(&first).await.unwrap();
        log.append(&second).await.unwrap();

        let entries = log.entries().await.unwrap();
        assert_eq!(entries, vec![first, second]);
    }

    #[tokio::test]
    async fn test_script_log_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = ScriptLog::new(dir.path().join("scripts.jsonl"));
        assert!(log.entries().await.unwrap().is_empty());
    }
}
