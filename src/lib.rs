//! Core of an embeddable to-do list widget: an ordered task store with
//! write-through single-blob persistence, and the compose/edit interaction
//! state machine that drives it. Rendering is the host's job; it polls
//! [`store::TaskStore::snapshot`] or subscribes for change notifications.

pub mod controller;
pub mod events;
#[cfg(feature = "file-log")]
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
pub mod store;

pub use controller::{Controller, Mode};
pub use events::{ChangeKind, StateListener, StatePayload};
pub use models::{Task, TaskId, Timestamp};
pub use storage::{Backend, FileBackend, MemoryBackend, StorageError};
pub use store::TaskStore;
