use crate::domain::model::JournalEntry;
use crate::domain::ports::BookingJournal;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only JSON-lines journal on local disk.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the journal for appending, cutting off a torn final line left by
    /// an interrupted write.
    async fn open_for_append(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let content = fs::read(&self.path).await?;
        let intact = content
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |newline| newline + 1);
        if intact < content.len() {
            tracing::warn!(
                "Dropping {} bytes of torn tail from journal {}",
                content.len() - intact,
                self.path.display()
            );
            file.set_len(intact as u64).await?;
        }
        Ok(file)
    }
}

async fn write_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.sync_data().await
}

impl BookingJournal for FileJournal {
    /// Either the whole line is durable or the file is rolled back to its
    /// previous length.
    async fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut handle = self.file.lock().await;
        let mut file = match handle.take() {
            Some(file) => file,
            None => self.open_for_append().await?,
        };

        let committed = file.metadata().await?.len();
        if let Err(e) = write_line(&mut file, &line).await {
            tracing::error!(
                "Journal append to {} failed, rolling back to {} bytes: {}",
                self.path.display(),
                committed,
                e
            );
            if let Err(rollback) = file.set_len(committed).await {
                tracing::error!("Journal rollback failed: {}", rollback);
            }
            // dropped handle; the next append reopens and repairs the tail
            return Err(e.into());
        }

        *handle = Some(file);
        Ok(())
    }

    async fn load(&self) -> Result<Vec<JournalEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No journal at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let torn_tail = !content.is_empty() && !content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        let mut entries = Vec::new();
        for (number, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry: JournalEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(e) if torn_tail && number + 1 == lines.len() => {
                    tracing::warn!(
                        "Ignoring torn last line {} in {}: {}",
                        number + 1,
                        self.path.display(),
                        e
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        "Unreadable journal line {} in {}: {}",
                        number + 1,
                        self.path.display(),
                        e
                    );
                    return Err(e.into());
                }
            };
            entries.push(entry);
        }
        Ok(entries)
    }
}

/// Journal kept in memory; clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().await.clone()
    }
}

impl BookingJournal for MemoryJournal {
    async fn append(&self, entry: &JournalEntry) -> Result<()> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<JournalEntry>> {
        Ok(self.entries.lock().await.clone())
    }
}
