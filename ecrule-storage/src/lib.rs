//! Editing contexts for ecrule.
//!
//! An [`EditingContext`] is a unit of work over persistent objects: it
//! collects inserts, updates and deletes as pending changes and hands them to
//! an [`ObjectStore`] on [`save_changes`](EditingContext::save_changes).
//!
//! # Stores
//!
//! - [`SqliteObjectStore`]: objects as JSON rows in a SQLite table; the
//!   in-memory variant backs "temporary" contexts whose data disappears with
//!   the context
//! - [`MemoryObjectStore`]: a plain map, for "mock" contexts that never
//!   touch a database
//!
//! # Locking
//!
//! Mutations require the context to be locked. `unlock` is counted rather
//! than paired: every call is tallied, and the hold count never goes below
//! zero, so the extra unlock performed by [`dispose`](EditingContext::dispose)
//! is harmless.

mod changes;
mod context;
mod error;
mod memory_store;
mod sqlite_store;
mod store;

pub use changes::ChangeSet;
pub use context::EditingContext;
pub use error::{StorageError, StorageResult};
pub use memory_store::MemoryObjectStore;
pub use sqlite_store::SqliteObjectStore;
pub use store::ObjectStore;
