pub mod error;
pub mod snapshot;
pub mod store;

pub use error::DomainError;
pub use snapshot::{DEFAULT_LIST_CODE, MarkDone, Snapshot, Task, TaskList};
pub use store::TaskStore;
