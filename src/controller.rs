use crate::models::{Task, TaskId};
use crate::store::TaskStore;

/// Transient UI state of the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Add form hidden, nothing being edited.
    Idle,
    /// Add form visible, awaiting submit.
    Composing { input: String },
    /// Exactly one task in inline-edit mode with a live buffer.
    Editing { id: TaskId, buffer: String },
}

/// Translates user gestures into [`TaskStore`] operations and tracks the
/// compose/edit state machine.
///
/// Two "end edit" triggers compete in the original widget: the explicit
/// save/cancel gesture and the implicit focus loss. Here the explicit
/// gesture always wins by construction: it transitions to [`Mode::Idle`]
/// synchronously, and [`Controller::blur_edit`] only acts when an edit is
/// still in progress.
pub struct Controller {
    store: TaskStore,
    mode: Mode,
}

impl Controller {
    pub fn new(store: TaskStore) -> Self {
        Self {
            store,
            mode: Mode::Idle,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn mode(&self) -> &Mode {
        self.mode_checked()
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.mode(), Mode::Composing { .. })
    }

    pub fn editing_id(&self) -> Option<TaskId> {
        match self.mode() {
            Mode::Editing { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn edit_buffer(&self) -> Option<&str> {
        match self.mode() {
            Mode::Editing { buffer, .. } => Some(buffer.as_str()),
            _ => None,
        }
    }

    /// The add button doubles as open-form and submit, as in the original
    /// widget: hidden form opens it, visible form submits it.
    pub fn press_add_button(&mut self) -> Option<Task> {
        self.reconcile();
        if matches!(self.mode, Mode::Composing { .. }) {
            return self.submit();
        }
        // Opening the form while editing ends the edit the same way an
        // edit-switch does: commit a non-empty buffer, cancel otherwise.
        if matches!(self.mode, Mode::Editing { .. }) {
            self.commit_edit();
        }
        self.mode = Mode::Composing {
            input: String::new(),
        };
        None
    }

    /// Updates the add-form input buffer. No-op outside `Composing`.
    pub fn set_input(&mut self, text: &str) {
        self.reconcile();
        if let Mode::Composing { input } = &mut self.mode {
            *input = text.to_string();
        }
    }

    /// Submits the add form. Empty or whitespace input closes the form
    /// without creating anything; otherwise the task is created and the
    /// form closes with a cleared buffer.
    pub fn submit(&mut self) -> Option<Task> {
        self.reconcile();
        let input = match &self.mode {
            Mode::Composing { input } => input.clone(),
            _ => return None,
        };
        self.mode = Mode::Idle;
        self.store.add(&input)
    }

    /// Closes the add form, discarding any typed input.
    pub fn cancel_compose(&mut self) {
        self.reconcile();
        if matches!(self.mode, Mode::Composing { .. }) {
            self.mode = Mode::Idle;
        }
    }

    /// Starts inline editing of `id`, seeding the buffer with the task's
    /// current text. Only one task can be under edit: a prior edit of a
    /// different task is committed when its trimmed buffer is non-empty and
    /// cancelled otherwise. Unknown ids and re-entering the current edit
    /// are no-ops.
    pub fn start_edit(&mut self, id: TaskId) {
        self.reconcile();
        if self.editing_id() == Some(id) {
            return;
        }
        let text = match self.store.get(id) {
            Some(task) => task.text,
            None => return,
        };
        if matches!(self.mode, Mode::Editing { .. }) {
            self.commit_edit();
        }
        self.mode = Mode::Editing { id, buffer: text };
    }

    /// Replaces the live edit buffer. No-op outside `Editing`.
    pub fn set_edit_buffer(&mut self, text: &str) {
        self.reconcile();
        if let Mode::Editing { buffer, .. } = &mut self.mode {
            *buffer = text.to_string();
        }
    }

    /// Explicit save. A buffer that trims to empty cancels instead of
    /// writing. Always leaves edit mode. Answers whether the task text
    /// actually changed.
    pub fn commit_edit(&mut self) -> bool {
        self.reconcile();
        let (id, buffer) = match &self.mode {
            Mode::Editing { id, buffer } => (*id, buffer.clone()),
            _ => return false,
        };
        self.mode = Mode::Idle;
        self.store.edit(id, &buffer)
    }

    /// Implicit focus-loss save. Same semantics as [`Controller::commit_edit`]
    /// except it never reopens a finished edit: when an explicit save or
    /// cancel already ran, the state is `Idle` and the blur does nothing.
    pub fn blur_edit(&mut self) -> bool {
        self.commit_edit()
    }

    /// Explicit cancel (Escape). Discards the buffer without mutating.
    pub fn cancel_edit(&mut self) {
        self.reconcile();
        if matches!(self.mode, Mode::Editing { .. }) {
            self.mode = Mode::Idle;
        }
    }

    /// Deletes a task through the store and drops a matching edit state so
    /// the widget never shows an editor for a task that no longer exists.
    pub fn delete(&mut self, id: TaskId) -> bool {
        self.reconcile();
        let removed = self.store.remove(id);
        if self.editing_id() == Some(id) {
            self.mode = Mode::Idle;
        }
        removed
    }

    // The task under edit can disappear underneath us (another handle to the
    // same store). Every gesture starts here so a stale edit collapses to
    // Idle before anything else looks at the mode.
    fn reconcile(&mut self) {
        if let Mode::Editing { id, .. } = &self.mode {
            if !self.store.contains(*id) {
                self.mode = Mode::Idle;
            }
        }
    }

    fn mode_checked(&self) -> &Mode {
        // Read-only variant of `reconcile` for accessors: report Idle for a
        // stale edit without needing `&mut self`.
        static IDLE: Mode = Mode::Idle;
        if let Mode::Editing { id, .. } = &self.mode {
            if !self.store.contains(*id) {
                return &IDLE;
            }
        }
        &self.mode
    }
}
