//! The personal todo store.
//!
//! Todos have no owner; the collection belongs to the local data directory.
//! New items are prepended, but display order is decided by
//! [`crate::view::todo_view`].

use std::sync::Arc;

use tracing::debug;

use crate::clock::{Clock, Stamper};
use crate::id;
use crate::model::{Todo, TodoPriority};
use crate::storage::{SharedStore, Slot, TODOS_KEY};

pub struct TodoStore {
    todos: Vec<Todo>,
    slot: Slot<Vec<Todo>>,
    clock: Arc<dyn Clock>,
    stamper: Stamper,
}

impl TodoStore {
    /// Rehydrate from `backend`; missing or unreadable data starts empty.
    pub fn open(backend: SharedStore, clock: Arc<dyn Clock>) -> Self {
        let slot: Slot<Vec<Todo>> = Slot::new(backend, TODOS_KEY);
        let todos = slot.load().unwrap_or_default();
        let mut stamper = Stamper::new();
        for todo in &todos {
            stamper.observe(todo.created_at);
        }
        Self {
            todos,
            slot,
            clock,
            stamper,
        }
    }

    #[must_use]
    pub fn all(&self) -> &[Todo] {
        &self.todos
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// Add a todo. Returns `None` if the trimmed text is empty.
    pub fn add(&mut self, text: &str, priority: TodoPriority) -> Option<Todo> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let now = self.stamper.next(self.clock.as_ref());
        let todo = Todo {
            id: id::allocate(now.timestamp_millis(), |c| self.get(c).is_some()),
            text: text.to_string(),
            completed: false,
            created_at: now,
            priority,
        };
        debug!(id = %todo.id, "todo added");
        self.todos.insert(0, todo.clone());
        self.persist();
        Some(todo)
    }

    /// Flip `completed`. Returns `false` for an unknown id.
    pub fn toggle(&mut self, id: &str) -> bool {
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        todo.completed = !todo.completed;
        debug!(id, completed = todo.completed, "todo toggled");
        self.persist();
        true
    }

    /// Delete a todo. Returns `false` for an unknown id.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        if self.todos.len() == before {
            return false;
        }
        debug!(id, "todo removed");
        self.persist();
        true
    }

    /// Replace a todo's text. Returns `false` for an unknown id or blank text.
    pub fn edit(&mut self, id: &str, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        let Some(todo) = self.todos.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        todo.text = text.to_string();
        debug!(id, "todo edited");
        self.persist();
        true
    }

    /// Drop every completed todo, returning how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|t| !t.completed);
        let removed = before - self.todos.len();
        if removed > 0 {
            debug!(removed, "completed todos cleared");
            self.persist();
        }
        removed
    }

    fn persist(&self) {
        self.slot.save(&self.todos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::{KeyValueStore, MemoryStore};

    fn fresh() -> (TodoStore, SharedStore) {
        let backend = MemoryStore::shared();
        let store = TodoStore::open(
            Arc::clone(&backend),
            Arc::new(ManualClock::starting_at(1_710_000_000_000)),
        );
        (store, backend)
    }

    #[test]
    fn opens_empty_without_writing() {
        let (store, backend) = fresh();
        assert!(store.all().is_empty());
        assert_eq!(backend.get(TODOS_KEY).unwrap(), None);
    }

    #[test]
    fn corrupt_payload_opens_empty() {
        let backend = MemoryStore::shared();
        backend.set(TODOS_KEY, "not json").unwrap();
        let store = TodoStore::open(backend, Arc::new(ManualClock::starting_at(0)));
        assert!(store.all().is_empty());
    }

    #[test]
    fn add_trims_defaults_and_prepends() {
        let (mut store, _) = fresh();
        let first = store.add("  water plants ", TodoPriority::default()).expect("added");
        let second = store.add("file taxes", TodoPriority::High).expect("added");
        assert_eq!(first.text, "water plants");
        assert_eq!(first.priority, TodoPriority::Medium);
        assert!(!first.completed);
        assert_eq!(store.all()[0].id, second.id);
        assert!(second.created_at > first.created_at);
        assert!(store.add(" \t ", TodoPriority::Low).is_none());
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn toggle_twice_restores_state() {
        let (mut store, _) = fresh();
        let todo = store.add("stretch", TodoPriority::Low).expect("added");
        assert!(store.toggle(&todo.id));
        assert!(store.get(&todo.id).unwrap().completed);
        assert!(store.toggle(&todo.id));
        assert!(!store.get(&todo.id).unwrap().completed);
        assert!(!store.toggle("missing"));
    }

    #[test]
    fn remove_unknown_leaves_collection_alone() {
        let (mut store, backend) = fresh();
        store.add("a", TodoPriority::Low);
        store.add("b", TodoPriority::Low);
        let before = store.all().to_vec();
        let stored = backend.get(TODOS_KEY).unwrap();
        assert!(!store.remove("missing"));
        assert_eq!(store.all(), before.as_slice());
        assert_eq!(backend.get(TODOS_KEY).unwrap(), stored);
    }

    #[test]
    fn edit_and_clear_completed() {
        let (mut store, _) = fresh();
        let keep = store.add("keep", TodoPriority::Low).expect("added");
        let done = store.add("done", TodoPriority::Low).expect("added");
        assert!(store.edit(&keep.id, "  kept "));
        assert!(!store.edit(&keep.id, "   "));
        assert_eq!(store.get(&keep.id).unwrap().text, "kept");

        store.toggle(&done.id);
        assert_eq!(store.clear_completed(), 1);
        assert_eq!(store.clear_completed(), 0);
        assert_eq!(store.all().len(), 1);
        assert_eq!(store.all()[0].id, keep.id);
    }

    #[test]
    fn changes_are_written_through() {
        let (mut store, backend) = fresh();
        let todo = store.add("read", TodoPriority::High).expect("added");
        store.toggle(&todo.id);
        let reopened = TodoStore::open(backend, Arc::new(ManualClock::starting_at(0)));
        assert_eq!(reopened.all(), store.all());
    }
}
