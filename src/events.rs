use crate::models::Task;

/// What a mutation did, delivered alongside the full snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Loaded,
    Added,
    Toggled,
    Edited,
    Removed,
    ClearedCompleted,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatePayload {
    pub kind: ChangeKind,
    pub tasks: Vec<Task>,
}

/// Callback registered with [`crate::store::TaskStore::subscribe`]. Invoked
/// after the mutation has been applied and persisted (or the persistence
/// failure logged), outside the store lock.
pub type StateListener = Box<dyn Fn(&StatePayload) + Send>;
