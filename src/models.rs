use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch. Task ids are seeded from this clock.
pub type Timestamp = i64;

/// Identifier of a task. Unique within a store instance, assigned at
/// creation, never reused.
pub type TaskId = i64;

/// One entry of the to-do list.
///
/// This is also the persisted record shape: the store serializes its whole
/// list as a JSON array of these. Extra fields written by a newer version are
/// tolerated on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            done: false,
        }
    }
}
