use chrono::Utc;

use crate::models::{Task, TaskId, Timestamp};

/// Generator for task ids.
///
/// Ids are seeded from the wall clock in milliseconds so they double as
/// creation times, but they are forced strictly monotonic: two adds within
/// the same millisecond (or after a clock regression) still get distinct,
/// increasing ids.
#[derive(Debug, Default)]
pub struct IdGen {
    last: TaskId,
}

impl IdGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the generator so it never emits an id at or below `floor`.
    /// Called with the largest persisted id after a load.
    pub fn seed(&mut self, floor: TaskId) {
        if floor > self.last {
            self.last = floor;
        }
    }

    pub fn next(&mut self) -> TaskId {
        self.next_at(Utc::now().timestamp_millis())
    }

    fn next_at(&mut self, now: Timestamp) -> TaskId {
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// The plain in-memory ordered collection. Insertion order is the only
/// order; there is no reorder operation. All lookups are by id and missing
/// ids are no-ops reported through the return value.
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: Vec<Task>,
    ids: IdGen,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole collection, e.g. from a loaded blob, and seeds the
    /// id generator past every existing id.
    pub fn replace(&mut self, tasks: Vec<Task>) {
        if let Some(max_id) = tasks.iter().map(|task| task.id).max() {
            self.ids.seed(max_id);
        }
        self.tasks = tasks;
    }

    /// Appends a task with `text` already trimmed and validated non-empty by
    /// the caller. Returns a copy of the new record.
    pub fn append(&mut self, text: String) -> Task {
        let task = Task::new(self.ids.next(), text);
        self.tasks.push(task.clone());
        task
    }

    pub fn flip_done(&mut self, id: TaskId) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.done = !task.done;
                true
            }
            None => false,
        }
    }

    pub fn retitle(&mut self, id: TaskId, text: String) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.text = text;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    pub fn remove_done(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|task| !task.done);
        before - self.tasks.len()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|task| task.id == id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn to_vec(&self) -> Vec<Task> {
        self.tasks.clone()
    }
}
