//! `tab_left` / `tab_right` keyboard commands: focus the neighboring tab in
//! the current window, wrapping around at either end.

use tabkeeper_daemon_protocol::{TabId, TabInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Left,
    Right,
}

impl CycleDirection {
    pub fn from_command(name: &str) -> Option<Self> {
        match name {
            "tab_left" => Some(CycleDirection::Left),
            "tab_right" => Some(CycleDirection::Right),
            _ => None,
        }
    }
}

/// Picks the tab to focus from `current`'s window. `None` only when the
/// window has no tabs to wrap to.
pub fn pick_cycle_target(
    direction: CycleDirection,
    current: &TabInfo,
    tabs: &[TabInfo],
) -> Option<TabId> {
    match direction {
        CycleDirection::Left => {
            let neighbor = current
                .index
                .checked_sub(1)
                .and_then(|index| tabs.iter().find(|tab| tab.index == index));
            neighbor
                .or_else(|| tabs.iter().max_by_key(|tab| tab.index))
                .map(|tab| tab.id)
        }
        CycleDirection::Right => {
            let neighbor = current
                .index
                .checked_add(1)
                .and_then(|index| tabs.iter().find(|tab| tab.index == index));
            neighbor
                .or_else(|| tabs.iter().find(|tab| tab.index == 0))
                .map(|tab| tab.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabkeeper_daemon_protocol::WindowId;

    fn strip(count: u32) -> Vec<TabInfo> {
        (0..count)
            .map(|index| TabInfo {
                id: TabId(100 + index),
                window_id: WindowId(1),
                index,
                opener_tab_id: None,
                url: None,
                active: false,
            })
            .collect()
    }

    #[test]
    fn parses_command_names() {
        assert_eq!(
            CycleDirection::from_command("tab_left"),
            Some(CycleDirection::Left)
        );
        assert_eq!(
            CycleDirection::from_command("tab_right"),
            Some(CycleDirection::Right)
        );
        assert_eq!(CycleDirection::from_command("tab_up"), None);
    }

    #[test]
    fn left_moves_one_tab_and_wraps_to_rightmost() {
        let tabs = strip(4);
        assert_eq!(
            pick_cycle_target(CycleDirection::Left, &tabs[2], &tabs),
            Some(TabId(101))
        );
        assert_eq!(
            pick_cycle_target(CycleDirection::Left, &tabs[0], &tabs),
            Some(TabId(103))
        );
    }

    #[test]
    fn right_moves_one_tab_and_wraps_to_leftmost() {
        let tabs = strip(4);
        assert_eq!(
            pick_cycle_target(CycleDirection::Right, &tabs[1], &tabs),
            Some(TabId(102))
        );
        assert_eq!(
            pick_cycle_target(CycleDirection::Right, &tabs[3], &tabs),
            Some(TabId(100))
        );
    }

    #[test]
    fn single_tab_focuses_itself() {
        let tabs = strip(1);
        assert_eq!(
            pick_cycle_target(CycleDirection::Right, &tabs[0], &tabs),
            Some(TabId(100))
        );
        assert_eq!(
            pick_cycle_target(CycleDirection::Left, &tabs[0], &tabs),
            Some(TabId(100))
        );
    }

    #[test]
    fn right_from_largest_index_wraps_without_overflow() {
        let tabs = strip(2);
        let current = TabInfo {
            index: u32::MAX,
            ..tabs[1].clone()
        };
        assert_eq!(
            pick_cycle_target(CycleDirection::Right, &current, &tabs),
            Some(TabId(100))
        );
    }

    #[test]
    fn empty_window_has_no_target() {
        let current = strip(1).remove(0);
        assert_eq!(pick_cycle_target(CycleDirection::Left, &current, &[]), None);
    }
}
