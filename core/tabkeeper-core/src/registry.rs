use std::collections::HashMap;

use tabkeeper_daemon_protocol::{TabInfo, WindowId, WindowInfo};
use tracing::debug;

use crate::window_state::{IndexLookup, WindowState};

/// Window id → tracking state. Entries appear on first reference and go away
/// only when the host reports the window closed.
#[derive(Debug, Default)]
pub struct WindowStateRegistry {
    windows: HashMap<WindowId, WindowState>,
}

impl WindowStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state for `window_id`, creating it if this is the first
    /// time the window is referenced.
    pub fn get(&mut self, window_id: WindowId) -> &mut WindowState {
        self.windows.entry(window_id).or_insert_with(|| {
            debug!(window_id = %window_id, "Tracking new window");
            WindowState::new()
        })
    }

    /// Lookup that never creates. Used by reply handlers so a late answer
    /// cannot resurrect a closed window.
    pub fn get_existing(&self, window_id: WindowId) -> Option<&WindowState> {
        self.windows.get(&window_id)
    }

    pub fn get_existing_mut(&mut self, window_id: WindowId) -> Option<&mut WindowState> {
        self.windows.get_mut(&window_id)
    }

    pub fn delete(&mut self, window_id: WindowId) -> bool {
        self.windows.remove(&window_id).is_some()
    }

    pub fn contains(&self, window_id: WindowId) -> bool {
        self.windows.contains_key(&window_id)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.windows.keys().copied().collect();
        ids.sort();
        ids
    }

    /// First startup step: make sure every open window has a state.
    pub fn seed_windows(&mut self, windows: &[WindowInfo]) -> usize {
        let mut created = 0;
        for window in windows {
            if !self.contains(window.id) {
                self.windows.insert(window.id, WindowState::new());
                created += 1;
            }
        }
        created
    }

    /// Second startup step: record each window's currently active tab.
    pub fn seed_active_tabs(&mut self, tabs: &[TabInfo]) -> Vec<(WindowId, IndexLookup)> {
        tabs.iter()
            .map(|tab| (tab.window_id, self.get(tab.window_id).add(tab.id)))
            .collect()
    }
}
