//! Per-window tracking state: activation history, the in-order placement
//! anchor and the active tab's strip position.
//!
//! All three carry a single-depth undo shadow so that `rewind` can take back
//! the spurious activation the host performs right before announcing that
//! the active tab was closed.

use tabkeeper_daemon_protocol::TabId;
use tracing::debug;

use crate::history::HistoryList;
use crate::undo::UndoSlot;

/// Position lookup issued by [`WindowState::add`].
///
/// Carries the tab that was most recent when the lookup was issued. The
/// result is only applied if that tab is still most recent on resolution.
/// `generation` orders lookups within one window.
#[must_use = "the lookup must be sent to the host and resolved"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexLookup {
    pub tab_id: TabId,
    pub generation: u64,
}

#[derive(Debug, Clone, Default)]
pub struct WindowState {
    history: HistoryList,
    in_order_anchor: UndoSlot<Option<TabId>>,
    active_index: UndoSlot<Option<u32>>,
    lookup_generation: u64,
    latest_lookup_pending: bool,
}

impl WindowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &HistoryList {
        &self.history
    }

    pub fn in_order_anchor(&self) -> Option<TabId> {
        *self.in_order_anchor.get()
    }

    pub fn set_in_order_anchor(&mut self, anchor: Option<TabId>) {
        self.in_order_anchor.set(anchor);
    }

    pub fn active_index(&self) -> Option<u32> {
        *self.active_index.get()
    }

    pub fn set_active_index(&mut self, index: Option<u32>) {
        self.active_index.set(index);
    }

    pub fn index_update_in_flight(&self) -> bool {
        self.latest_lookup_pending
    }

    /// Records `tab_id` as the active tab and returns the position lookup the
    /// caller must send to the host.
    pub fn add(&mut self, tab_id: TabId) -> IndexLookup {
        self.history.add(tab_id);
        self.in_order_anchor.set(Some(tab_id));
        self.lookup_generation += 1;
        self.latest_lookup_pending = true;
        IndexLookup {
            tab_id,
            generation: self.lookup_generation,
        }
    }

    /// Applies the answer to a lookup from [`WindowState::add`]. `index` is
    /// `None` when the host could not find the tab.
    ///
    /// Returns whether the position was applied.
    pub fn resolve_index(&mut self, lookup: IndexLookup, index: Option<u32>) -> bool {
        // Only the newest lookup clears the mark.
        if lookup.generation == self.lookup_generation {
            self.latest_lookup_pending = false;
        }

        let Some(index) = index else {
            debug!(tab_id = %lookup.tab_id, "Active tab vanished before its index resolved");
            return false;
        };

        if self.history.first() != Some(lookup.tab_id) {
            debug!(
                tab_id = %lookup.tab_id,
                current = ?self.history.first(),
                "Discarding stale active index"
            );
            return false;
        }

        self.active_index.set(Some(index));
        true
    }

    pub fn remove(&mut self, tab_id: TabId) {
        self.history.remove(tab_id);
        if self.in_order_anchor() == Some(tab_id) {
            self.in_order_anchor.set(self.history.first());
        }
    }

    /// Takes back the last activation. The active index is left alone while a
    /// lookup is outstanding because that lookup already carries the position
    /// the rewind should land on.
    pub fn rewind(&mut self) {
        self.history.rewind();
        self.in_order_anchor.restore();
        if !self.index_update_in_flight() {
            self.active_index.restore();
        }
    }

    /// Keeps the active index in step when the host reports a move of the tab
    /// sitting at that position.
    pub fn track_move(&mut self, from_index: u32, to_index: u32) -> bool {
        if self.active_index() != Some(from_index) {
            return false;
        }
        self.active_index.set(Some(to_index));
        true
    }
}
