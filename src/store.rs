use std::sync::{Arc, Mutex};

use crate::events::{ChangeKind, StateListener, StatePayload};
use crate::models::{Task, TaskId};
use crate::state::TaskList;
use crate::storage::Backend;

/// The authoritative task collection with write-through persistence.
///
/// `TaskStore` is a cheap clone handle; the controller and a host shell can
/// each hold one. Every mutation applies in memory first, then rewrites the
/// persisted blob. Persistence failures never surface to callers: a read
/// failure means starting empty, a write failure is logged and retried on
/// the next mutation.
#[derive(Clone)]
pub struct TaskStore {
    inner: Arc<Mutex<StoreInner>>,
    listeners: Arc<Mutex<Vec<StateListener>>>,
}

struct StoreInner {
    list: TaskList,
    backend: Box<dyn Backend>,
    // Set when a write failed; the next successful write catches the blob up.
    dirty: bool,
}

impl TaskStore {
    /// Builds the store from whatever the backend holds. Absent, malformed,
    /// or non-list blobs all yield an empty store.
    pub fn open(backend: Box<dyn Backend>) -> Self {
        let mut list = TaskList::new();
        match backend.load() {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<Task>>(&blob) {
                Ok(tasks) => list.replace(tasks),
                Err(err) => {
                    log::warn!("persisted task list unreadable, starting empty: {err}");
                }
            },
            Ok(None) => {}
            Err(err) => {
                log::warn!("failed to read persisted task list, starting empty: {err}");
            }
        }
        let store = Self {
            inner: Arc::new(Mutex::new(StoreInner {
                list,
                backend,
                dirty: false,
            })),
            listeners: Arc::new(Mutex::new(Vec::new())),
        };
        store.notify(ChangeKind::Loaded, store.snapshot());
        store
    }

    /// Registers a change listener. Listeners see every mutation (and the
    /// initial load is visible via [`TaskStore::snapshot`]); they run on the
    /// mutating call, after persistence, outside the store lock.
    pub fn subscribe(&self, listener: StateListener) {
        self.listeners
            .lock()
            .expect("listeners poisoned")
            .push(listener);
    }

    /// Appends a task. The text is trimmed; an empty result is a silent
    /// no-op and answers `None`.
    pub fn add(&self, text: &str) -> Option<Task> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (task, tasks) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let task = guard.list.append(text.to_string());
            let tasks = self.persist(&mut guard);
            (task, tasks)
        };
        self.notify(ChangeKind::Added, tasks);
        Some(task)
    }

    /// Flips the completion flag. Answers `false` when the id is absent.
    pub fn toggle(&self, id: TaskId) -> bool {
        let tasks = {
            let mut guard = self.inner.lock().expect("state poisoned");
            if !guard.list.flip_done(id) {
                return false;
            }
            self.persist(&mut guard)
        };
        self.notify(ChangeKind::Toggled, tasks);
        true
    }

    /// Replaces a task's text. Trimming to empty is a cancel, not a
    /// mutation. Answers `false` when nothing changed.
    pub fn edit(&self, id: TaskId, new_text: &str) -> bool {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return false;
        }
        let tasks = {
            let mut guard = self.inner.lock().expect("state poisoned");
            if !guard.list.retitle(id, new_text.to_string()) {
                return false;
            }
            self.persist(&mut guard)
        };
        self.notify(ChangeKind::Edited, tasks);
        true
    }

    /// Deletes a task. Idempotent; answers `false` when already gone.
    pub fn remove(&self, id: TaskId) -> bool {
        let tasks = {
            let mut guard = self.inner.lock().expect("state poisoned");
            if !guard.list.remove(id) {
                return false;
            }
            self.persist(&mut guard)
        };
        self.notify(ChangeKind::Removed, tasks);
        true
    }

    /// Deletes every completed task and answers how many went away. Still
    /// writes through when nothing matched, so the blob always equals the
    /// latest snapshot.
    pub fn clear_completed(&self) -> usize {
        let (removed, tasks) = {
            let mut guard = self.inner.lock().expect("state poisoned");
            let removed = guard.list.remove_done();
            let tasks = self.persist(&mut guard);
            (removed, tasks)
        };
        self.notify(ChangeKind::ClearedCompleted, tasks);
        removed
    }

    pub fn contains(&self, id: TaskId) -> bool {
        let guard = self.inner.lock().expect("state poisoned");
        guard.list.contains(id)
    }

    pub fn get(&self, id: TaskId) -> Option<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.list.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        let guard = self.inner.lock().expect("state poisoned");
        guard.list.tasks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current ordered sequence, cloned out for rendering.
    pub fn snapshot(&self) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.list.to_vec()
    }

    /// True when the last write failed and the blob lags the memory state.
    pub fn is_dirty(&self) -> bool {
        let guard = self.inner.lock().expect("state poisoned");
        guard.dirty
    }

    // Rewrites the whole blob from the current list. Must be called with the
    // guard held; returns the snapshot so notification can happen after the
    // guard is dropped.
    fn persist(&self, guard: &mut StoreInner) -> Vec<Task> {
        let tasks = guard.list.to_vec();
        match serde_json::to_string(&tasks) {
            Ok(blob) => match guard.backend.store(&blob) {
                Ok(()) => guard.dirty = false,
                Err(err) => {
                    guard.dirty = true;
                    log::warn!("failed to persist task list, keeping in-memory state: {err}");
                }
            },
            Err(err) => {
                guard.dirty = true;
                log::warn!("failed to serialize task list: {err}");
            }
        }
        tasks
    }

    fn notify(&self, kind: ChangeKind, tasks: Vec<Task>) {
        let payload = StatePayload { kind, tasks };
        let listeners = self.listeners.lock().expect("listeners poisoned");
        for listener in listeners.iter() {
            listener(&payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, StorageError};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn memory_store() -> TaskStore {
        TaskStore::open(Box::new(MemoryBackend::new()))
    }

    /// Backend whose writes can be switched to fail, for quota-style faults.
    struct FlakyBackend {
        inner: MemoryBackend,
        fail_writes: Arc<AtomicBool>,
    }

    impl Backend for FlakyBackend {
        fn load(&self) -> Result<Option<String>, StorageError> {
            self.inner.load()
        }

        fn store(&self, blob: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("quota exceeded")));
            }
            self.inner.store(blob)
        }
    }

    #[test]
    fn add_appends_trimmed_unfinished_task() {
        let store = memory_store();
        let task = store.add("  Buy milk  ").expect("task created");
        assert_eq!(task.text, "Buy milk");
        assert!(!task.done);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_empty_and_whitespace_are_no_ops() {
        let store = memory_store();
        assert!(store.add("").is_none());
        assert!(store.add("   ").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn rapid_adds_get_distinct_ids() {
        let store = memory_store();
        let a = store.add("a").unwrap();
        let b = store.add("b").unwrap();
        let c = store.add("c").unwrap();
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn toggle_twice_restores_original_flag() {
        let store = memory_store();
        let id = store.add("task").unwrap().id;
        assert!(store.toggle(id));
        assert!(store.get(id).unwrap().done);
        assert!(store.toggle(id));
        assert!(!store.get(id).unwrap().done);
    }

    #[test]
    fn remove_twice_is_idempotent() {
        let store = memory_store();
        let id = store.add("task").unwrap().id;
        assert!(store.remove(id));
        assert!(!store.remove(id));
        assert!(store.is_empty());
    }

    #[test]
    fn edit_empty_is_a_cancel() {
        let store = memory_store();
        let id = store.add("Wash car").unwrap().id;
        assert!(!store.edit(id, ""));
        assert!(!store.edit(id, "   "));
        assert_eq!(store.get(id).unwrap().text, "Wash car");
    }

    #[test]
    fn edit_replaces_text_with_trimmed_value() {
        let store = memory_store();
        let id = store.add("Wash car").unwrap().id;
        assert!(store.edit(id, "  Wash bike  "));
        assert_eq!(store.get(id).unwrap().text, "Wash bike");
    }

    #[test]
    fn clear_completed_keeps_only_unfinished() {
        let store = memory_store();
        let ids: Vec<_> = ["1", "2", "3", "4"]
            .iter()
            .map(|text| store.add(text).unwrap().id)
            .collect();
        store.toggle(ids[0]);
        store.toggle(ids[1]);
        store.toggle(ids[2]);
        assert_eq!(store.clear_completed(), 3);
        let left: Vec<_> = store.snapshot().iter().map(|t| t.id).collect();
        assert_eq!(left, vec![ids[3]]);
    }

    #[test]
    fn snapshot_round_trips_through_a_fresh_store() {
        let first = memory_store();
        first.add("Buy milk");
        first.add("Walk dog");
        let id = first.snapshot()[0].id;
        first.toggle(id);

        let blob = serde_json::to_string(&first.snapshot()).unwrap();
        let second = TaskStore::open(Box::new(MemoryBackend::with_blob(blob)));
        assert_eq!(second.snapshot(), first.snapshot());
    }

    #[test]
    fn add_toggle_scenario_snapshot_order() {
        let store = memory_store();
        let first = store.add("Buy milk").unwrap();
        store.add("Walk dog");
        store.toggle(first.id);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].text, "Buy milk");
        assert!(snapshot[0].done);
        assert_eq!(snapshot[1].text, "Walk dog");
        assert!(!snapshot[1].done);
    }

    #[test]
    fn malformed_blob_loads_as_empty_store() {
        let store = TaskStore::open(Box::new(MemoryBackend::with_blob(r#"{"not":"a list"}"#)));
        assert!(store.is_empty());
        // The store is still usable afterwards.
        assert!(store.add("works").is_some());
    }

    #[test]
    fn garbage_blob_loads_as_empty_store() {
        let store = TaskStore::open(Box::new(MemoryBackend::with_blob("%%% not json %%%")));
        assert!(store.is_empty());
    }

    #[test]
    fn loaded_ids_never_collide_with_new_ones() {
        let far_future = i64::MAX - 10;
        let blob = format!(r#"[{{"id":{far_future},"text":"old","done":false}}]"#);
        let store = TaskStore::open(Box::new(MemoryBackend::with_blob(blob)));
        let new = store.add("new").unwrap();
        assert!(new.id > far_future);
    }

    #[test]
    fn write_failure_keeps_memory_state_and_marks_dirty() {
        let fail = Arc::new(AtomicBool::new(false));
        let store = TaskStore::open(Box::new(FlakyBackend {
            inner: MemoryBackend::new(),
            fail_writes: fail.clone(),
        }));

        fail.store(true, Ordering::SeqCst);
        let task = store.add("kept in memory").expect("mutation still applies");
        assert_eq!(store.len(), 1);
        assert!(store.is_dirty());

        // Next successful write catches the blob up.
        fail.store(false, Ordering::SeqCst);
        assert!(store.toggle(task.id));
        assert!(!store.is_dirty());
    }

    #[test]
    fn listeners_observe_mutations_with_full_snapshot() {
        let store = memory_store();
        let seen: Arc<Mutex<Vec<(ChangeKind, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        store.subscribe(Box::new(move |payload| {
            sink.lock()
                .unwrap()
                .push((payload.kind, payload.tasks.len()));
        }));

        let id = store.add("a").unwrap().id;
        store.toggle(id);
        store.clear_completed();

        let events = seen.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                (ChangeKind::Added, 1),
                (ChangeKind::Toggled, 1),
                (ChangeKind::ClearedCompleted, 0),
            ]
        );
    }

    #[test]
    fn rejected_mutations_do_not_notify() {
        let store = memory_store();
        let count = Arc::new(Mutex::new(0usize));
        let sink = count.clone();
        store.subscribe(Box::new(move |_| *sink.lock().unwrap() += 1));

        store.add("   ");
        store.toggle(12345);
        store.edit(12345, "text");
        store.remove(12345);
        assert_eq!(*count.lock().unwrap(), 0);
    }

    #[test]
    fn file_backend_round_trip_across_store_instances() {
        let dir = tempfile::tempdir().unwrap();
        let open = || {
            TaskStore::open(Box::new(crate::storage::FileBackend::new(
                dir.path().to_path_buf(),
            )))
        };

        let first = open();
        first.add("Buy milk");
        first.add("Walk dog");
        let id = first.snapshot()[1].id;
        first.toggle(id);
        let expected = first.snapshot();
        drop(first);

        let second = open();
        assert_eq!(second.snapshot(), expected);
    }
}
