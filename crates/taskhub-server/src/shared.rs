use std::sync::Arc;
use taskhub_store::{DomainError, Snapshot, TaskStore};
use tokio::sync::Mutex;

/// The process-wide exclusive gate around the store. Every session holds
/// this lock for the whole of each read-modify-write sequence, so
/// check-then-write pairs from different connections never interleave.
pub type Gate = Arc<Mutex<SharedStore>>;

/// Why a guarded mutation did not commit.
#[derive(Debug)]
pub enum MutateError {
    Domain(DomainError),
    /// Persisting the snapshot failed; the in-memory state was not changed.
    Storage(anyhow::Error),
}

impl From<DomainError> for MutateError {
    fn from(e: DomainError) -> Self {
        MutateError::Domain(e)
    }
}

/// The in-memory snapshot paired with its durable mirror.
pub struct SharedStore {
    snapshot: Snapshot,
    store: TaskStore,
}

impl SharedStore {
    pub fn new(store: TaskStore) -> Self {
        let snapshot = store.load();
        Self { snapshot, store }
    }

    pub fn open(store: TaskStore) -> Gate {
        Arc::new(Mutex::new(Self::new(store)))
    }

    /// Current committed state, for read-only queries.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Run a domain mutation against a scratch copy of the snapshot, persist
    /// it, and only then commit it as the in-memory state. A failed save
    /// leaves the in-memory state untouched, so nothing ever exists in
    /// memory that is not on disk. Semantic no-ops skip the save.
    pub fn mutate<T>(
        &mut self,
        f: impl FnOnce(&mut Snapshot) -> Result<T, DomainError>,
    ) -> Result<T, MutateError> {
        let mut next = self.snapshot.clone();
        let out = f(&mut next)?;
        if next != self.snapshot {
            self.store.save(&next).map_err(MutateError::Storage)?;
            self.snapshot = next;
        }
        Ok(out)
    }
}
