//! Durable reading queue.
//!
//! The queue file holds one chapter address per line; line order is
//! processing priority. Every mutation rewrites the whole file through a
//! temporary file that is atomically renamed over the original, and an
//! exclusive lock on `<file>.lock` keeps a second process from writing the
//! same queue.

use crate::locator::{ChapterLocator, LocatorError};
use crate::run_log::ScopedLog;
use fs2::FileExt;
use serde::Deserialize;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("queue {0} is locked by another process")]
    Locked(PathBuf),

    #[error("line {line} of the queue: {source}")]
    InvalidLocator { line: usize, source: LocatorError },

    #[error("no queue entry at position {0}")]
    UnknownPosition(usize),

    #[error("failed to replace queue file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// What `remove` drops from the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    /// Only the addressed entry
    #[default]
    SingleEntry,
    /// Every entry from the head through the addressed one
    TruncateThrough,
}

/// One title in the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Index in the queue as loaded; stays valid for the whole run
    pub position: usize,
    pub locator: ChapterLocator,
}

/// Snapshot of the live entries, in priority order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressQueue {
    entries: Vec<QueueEntry>,
}

impl ProgressQueue {
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }
}

impl IntoIterator for ProgressQueue {
    type Item = QueueEntry;
    type IntoIter = std::vec::IntoIter<QueueEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// File-backed queue owned by a single process
pub struct ProgressStore {
    path: PathBuf,
    policy: RemovalPolicy,
    /// Entries by load position; `None` once removed
    slots: Vec<Option<ChapterLocator>>,
    _lock: File,
    log: ScopedLog,
}

impl ProgressStore {
    /// Take the queue lock. Fails with `Locked` when another store holds it.
    pub fn open(
        path: impl Into<PathBuf>,
        policy: RemovalPolicy,
        log: ScopedLog,
    ) -> Result<Self, QueueError> {
        let path = path.into();
        let lock_path = lock_path_for(&path);
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        if lock.try_lock_exclusive().is_err() {
            return Err(QueueError::Locked(path));
        }

        Ok(Self {
            path,
            policy,
            slots: Vec::new(),
            _lock: lock,
            log,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RemovalPolicy {
        self.policy
    }

    /// Read the queue file. A missing file is an empty queue.
    pub fn load(&mut self) -> Result<ProgressQueue, QueueError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.log.warn(format_args!(
                    "Queue file {} not found, nothing to read",
                    self.path.display()
                ));
                String::new()
            }
            Err(e) => return Err(e.into()),
        };

        self.slots = parse_queue(&content)?.into_iter().map(Some).collect();
        self.log.info(format_args!(
            "Loaded {} queued titles from {}",
            self.slots.len(),
            self.path.display()
        ));
        Ok(self.snapshot())
    }

    /// Live entries as they stand now
    pub fn snapshot(&self) -> ProgressQueue {
        let entries = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(position, slot)| {
                slot.as_ref().map(|locator| QueueEntry {
                    position,
                    locator: locator.clone(),
                })
            })
            .collect();
        ProgressQueue { entries }
    }

    /// Rewrite the entry at `position` and persist the queue
    pub fn update(&mut self, position: usize, locator: &ChapterLocator) -> Result<(), QueueError> {
        let slot = self
            .slots
            .get_mut(position)
            .and_then(Option::as_mut)
            .ok_or(QueueError::UnknownPosition(position))?;
        *slot = locator.clone();
        self.persist()?;
        self.log
            .debug(format_args!("Position {} now at {}", position, locator));
        Ok(())
    }

    /// Drop the entry at `position` (and, for `TruncateThrough`, everything
    /// ahead of it) and persist the queue
    pub fn remove(&mut self, position: usize) -> Result<(), QueueError> {
        if !matches!(self.slots.get(position), Some(Some(_))) {
            return Err(QueueError::UnknownPosition(position));
        }

        match self.policy {
            RemovalPolicy::SingleEntry => self.slots[position] = None,
            RemovalPolicy::TruncateThrough => {
                for slot in &mut self.slots[..=position] {
                    *slot = None;
                }
            }
        }

        self.persist()?;
        self.log.info(format_args!(
            "Removed position {} from the queue ({:?}), {} titles left",
            position,
            self.policy,
            self.slots.iter().flatten().count()
        ));
        Ok(())
    }

    fn persist(&self) -> Result<(), QueueError> {
        let content = render_queue(self.slots.iter().flatten());
        atomic_write(&self.path, content.as_bytes())
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn parse_queue(content: &str) -> Result<Vec<ChapterLocator>, QueueError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            ChapterLocator::parse(line).map_err(|source| QueueError::InvalidLocator {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

fn render_queue<'a>(locators: impl Iterator<Item = &'a ChapterLocator>) -> String {
    let mut out = String::new();
    for locator in locators {
        out.push_str(&locator.to_string());
        out.push('\n');
    }
    out
}

/// Replace `path` with `contents` without ever exposing a partial file
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<(), QueueError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}
