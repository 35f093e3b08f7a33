//! Which tab gets focus after the active tab is closed.
//!
//! The host focuses a replacement *before* it reports the removal and never
//! says which tab was active. A removal is taken to be of the active tab when
//! an activation happened moments ago and the removed tab is second in
//! history, i.e. the host's own pick was pushed in front of it. This is a
//! best-effort heuristic.

use tabkeeper_daemon_protocol::{TabId, WindowId};
use tracing::{debug, error};

use crate::settings::OnClose;
use crate::window_state::WindowState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusChoice {
    /// Leave the host's pick alone.
    Keep,
    Tab(TabId),
    /// Focus whichever tab now sits at `index`, if any.
    TabAtIndex { window_id: WindowId, index: u32 },
}

pub fn was_active(state: &WindowState, tab_id: TabId, activation_recent: bool) -> bool {
    activation_recent && state.history().second() == Some(tab_id)
}

/// Updates `state` for the removal of `tab_id` and picks the tab to focus.
pub fn on_tab_removed(
    on_close: OnClose,
    state: &mut WindowState,
    window_id: WindowId,
    tab_id: TabId,
    activation_recent: bool,
) -> FocusChoice {
    let was_active = was_active(state, tab_id, activation_recent);

    if on_close != OnClose::Default && was_active {
        // Undo the host's auto-focus so history again reads "tab_id was active".
        state.rewind();
        debug!(
            window_id = %window_id,
            tab_id = %tab_id,
            first = ?state.history().first(),
            active_index = ?state.active_index(),
            "Rewound window state for closed active tab"
        );
    }

    state.remove(tab_id);

    if !was_active {
        return FocusChoice::Keep;
    }

    match on_close {
        OnClose::Default => FocusChoice::Keep,
        OnClose::LastFocused => state
            .history()
            .first()
            .map(FocusChoice::Tab)
            .unwrap_or(FocusChoice::Keep),
        OnClose::Next | OnClose::Previous => {
            let Some(index) = state.active_index() else {
                error!(
                    window_id = %window_id,
                    tab_id = %tab_id,
                    "Don't know the index of the removed tab"
                );
                return FocusChoice::Keep;
            };
            let index = if on_close == OnClose::Previous {
                index.saturating_sub(1)
            } else {
                index
            };
            FocusChoice::TabAtIndex { window_id, index }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: WindowId = WindowId(1);

    /// Activates each `(tab, index)` in turn with its lookup resolved.
    fn state_with(activations: &[(u32, u32)]) -> WindowState {
        let mut state = WindowState::new();
        for (tab, index) in activations {
            let lookup = state.add(TabId(*tab));
            assert!(state.resolve_index(lookup, Some(*index)));
        }
        state
    }

    /// Tab 3 (index 2) was active after tab 1 (index 0); closing 3 makes the
    /// host focus tab 2 (index 1) before reporting the removal.
    fn closed_active_tab_state() -> WindowState {
        state_with(&[(1, 0), (3, 2), (2, 1)])
    }

    #[test]
    fn detects_closed_active_tab() {
        let state = closed_active_tab_state();
        assert!(was_active(&state, TabId(3), true));
        assert!(!was_active(&state, TabId(3), false));
        assert!(!was_active(&state, TabId(1), true));
    }

    #[test]
    fn last_focused_picks_tab_active_before_closed_one() {
        let mut state = closed_active_tab_state();
        let choice = on_tab_removed(OnClose::LastFocused, &mut state, WINDOW, TabId(3), true);

        assert_eq!(choice, FocusChoice::Tab(TabId(1)));
        assert!(!state.history().contains(TabId(3)));
    }

    #[test]
    fn next_targets_closed_tabs_slot() {
        let mut state = closed_active_tab_state();
        let choice = on_tab_removed(OnClose::Next, &mut state, WINDOW, TabId(3), true);
        assert_eq!(
            choice,
            FocusChoice::TabAtIndex {
                window_id: WINDOW,
                index: 2
            }
        );
    }

    #[test]
    fn previous_targets_slot_before_closed_tab() {
        let mut state = closed_active_tab_state();
        let choice = on_tab_removed(OnClose::Previous, &mut state, WINDOW, TabId(3), true);
        assert_eq!(
            choice,
            FocusChoice::TabAtIndex {
                window_id: WINDOW,
                index: 1
            }
        );
    }

    #[test]
    fn previous_clamps_at_leftmost_slot() {
        let mut state = state_with(&[(2, 1), (1, 0), (5, 1)]);
        let choice = on_tab_removed(OnClose::Previous, &mut state, WINDOW, TabId(1), true);
        assert_eq!(
            choice,
            FocusChoice::TabAtIndex {
                window_id: WINDOW,
                index: 0
            }
        );
    }

    #[test]
    fn default_mode_never_intervenes() {
        let mut state = closed_active_tab_state();
        let choice = on_tab_removed(OnClose::Default, &mut state, WINDOW, TabId(3), true);

        assert_eq!(choice, FocusChoice::Keep);
        // No rewind: the host's pick stays most recent.
        assert_eq!(state.history().first(), Some(TabId(2)));
    }

    #[test]
    fn background_removal_only_updates_history() {
        let mut state = closed_active_tab_state();
        let choice = on_tab_removed(OnClose::LastFocused, &mut state, WINDOW, TabId(1), true);

        assert_eq!(choice, FocusChoice::Keep);
        assert_eq!(state.history().items(), &[TabId(2), TabId(3)]);
    }

    #[test]
    fn stale_activation_is_not_treated_as_close_of_active_tab() {
        let mut state = closed_active_tab_state();
        let choice = on_tab_removed(OnClose::LastFocused, &mut state, WINDOW, TabId(3), false);
        assert_eq!(choice, FocusChoice::Keep);
        assert_eq!(state.history().first(), Some(TabId(2)));
    }

    #[test]
    fn unknown_index_focuses_nothing() {
        let mut state = WindowState::new();
        let _ = state.add(TabId(3));
        let _ = state.add(TabId(2));

        let choice = on_tab_removed(OnClose::Next, &mut state, WINDOW, TabId(3), true);
        assert_eq!(choice, FocusChoice::Keep);
        assert!(state.history().is_empty());
    }
}
