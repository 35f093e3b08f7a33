//! Most-recently-activated-first list of tabs for one window.

use tabkeeper_daemon_protocol::TabId;

use crate::undo::UndoSlot;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryList {
    items: UndoSlot<Vec<TabId>>,
}

impl HistoryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `id` to the front, recording the prior order for one `rewind`.
    pub fn add(&mut self, id: TabId) {
        self.items.snapshot();
        let items = self.items.current_mut();
        items.retain(|existing| *existing != id);
        items.insert(0, id);
    }

    /// Drops `id` if tracked. Not undoable on its own.
    pub fn remove(&mut self, id: TabId) {
        self.items.current_mut().retain(|existing| *existing != id);
    }

    pub fn rewind(&mut self) {
        self.items.restore();
    }

    pub fn first(&self) -> Option<TabId> {
        self.items.get().first().copied()
    }

    pub fn second(&self) -> Option<TabId> {
        self.items.get().get(1).copied()
    }

    pub fn contains(&self, id: TabId) -> bool {
        self.items.get().contains(&id)
    }

    pub fn items(&self) -> &[TabId] {
        self.items.get()
    }

    pub fn len(&self) -> usize {
        self.items.get().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.get().is_empty()
    }
}
