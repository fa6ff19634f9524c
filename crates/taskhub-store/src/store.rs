use crate::snapshot::{DEFAULT_LIST_CODE, Snapshot, Task, TaskList};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// On-disk shapes accepted by [`TaskStore::load`]. Current snapshots carry a
/// `lists` map; pre-multi-list snapshots carry a top-level `tasks` array
/// instead and are migrated into a single "default" list.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    users: BTreeMap<String, String>,
    lists: Option<BTreeMap<String, TaskList>>,
    #[serde(default)]
    tasks: Vec<Task>,
}

impl RawSnapshot {
    fn into_snapshot(self) -> Snapshot {
        match self.lists {
            // A stray legacy `tasks` array next to a `lists` map is ignored.
            Some(lists) => Snapshot {
                users: self.users,
                lists,
            },
            None => {
                let mut lists = BTreeMap::new();
                lists.insert(
                    DEFAULT_LIST_CODE.to_string(),
                    TaskList {
                        name: DEFAULT_LIST_CODE.to_string(),
                        owner: None,
                        members: Vec::new(),
                        tasks: self.tasks,
                    },
                );
                Snapshot {
                    users: self.users,
                    lists,
                }
            }
        }
    }
}

/// Snapshot persistence backed by a single JSON file.
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot from disk. A missing or unreadable file yields the
    /// empty default snapshot; unreadable files are logged and left intact
    /// until the next successful save replaces them.
    pub fn load(&self) -> Snapshot {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Snapshot::empty(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "store unreadable, starting empty");
                return Snapshot::empty();
            }
        };
        match serde_json::from_str::<RawSnapshot>(&data) {
            Ok(raw) => raw.into_snapshot(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), err = %e, "store corrupt, starting empty");
                Snapshot::empty()
            }
        }
    }

    /// Write the full snapshot. Goes through a temp file in the same
    /// directory plus an atomic rename, so an interrupted save leaves the
    /// previous version intact.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let data = serde_json::to_string_pretty(snapshot).context("failed to encode snapshot")?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &data)
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }
}
