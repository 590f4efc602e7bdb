//! Line-delimited file holding the identifiers of the groups the bot has joined.

use std::{io::ErrorKind, path::PathBuf};

use anyhow::Context;
use log::{debug, info, warn};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};

/// Durable, duplicate-tolerant list of group identifiers.
///
/// Every group identifier is stored on its own line. Joining a group appends a
/// line without checking for an existing one, so the file may contain
/// duplicates: readers that need a set have to de-duplicate themselves.
///
/// All accesses go through a single lock so that a removal (full read then
/// overwrite of the file) can't lose an append made by a concurrent request.
pub struct RosterStore {
    /// Path of the roster file
    path: PathBuf,
    /// Serializes every access to the roster file
    lock: Mutex<()>,
}

impl RosterStore {
    /// Creates a roster backed by the file at `path`.
    ///
    /// The file doesn't need to exist yet, it is created on the first join.
    pub fn new(path: PathBuf) -> Self {
        RosterStore {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Appends `group_id` to the roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster file can't be opened or written.
    pub async fn add_group(&self, group_id: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open roster {}", self.path.display()))?;
        file.write_all(format!("{group_id}\n").as_bytes()).await?;
        file.flush().await?;

        info!("group {} added to the roster", group_id);
        Ok(())
    }

    /// Removes every occurrence of `group_id` from the roster.
    ///
    /// The whole file is read then rewritten without the matching lines. When
    /// the roster doesn't exist yet there is nothing to remove and the call
    /// succeeds without touching the disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster file exists but can't be read or rewritten.
    pub async fn remove_group(&self, group_id: &str) -> anyhow::Result<()> {
        let _guard = self.lock.lock().await;

        let Some(content) = self.read().await? else {
            debug!("no roster yet, nothing to remove for group {}", group_id);
            return Ok(());
        };

        let kept: String = content
            .lines()
            .filter(|line| line.trim() != group_id)
            .map(|line| format!("{line}\n"))
            .collect();

        fs::write(&self.path, kept)
            .await
            .with_context(|| format!("failed to rewrite roster {}", self.path.display()))?;

        info!("group {} removed from the roster", group_id);
        Ok(())
    }

    /// Returns the stored group identifiers, duplicates included.
    ///
    /// Blank lines are skipped. A missing roster is an empty roster.
    ///
    /// # Errors
    ///
    /// Returns an error if the roster file exists but can't be read.
    pub async fn list_groups(&self) -> anyhow::Result<Vec<String>> {
        let _guard = self.lock.lock().await;

        let Some(content) = self.read().await? else {
            return Ok(Vec::new());
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Reads the raw roster, `None` when it doesn't exist.
    ///
    /// A roster that isn't valid UTF-8 can't be trusted and is handled as empty.
    async fn read(&self) -> anyhow::Result<Option<String>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                warn!("roster {} is corrupted, handling it as empty", self.path.display());
                Ok(Some(String::new()))
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("failed to read roster {}", self.path.display()))),
        }
    }
}
