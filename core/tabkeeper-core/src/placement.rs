//! Where newly created tabs go.
//!
//! Placement is split into the synchronous decisions below and two host
//! lookups the engine performs in between: the in-order anchor tab (only
//! with `open_in_order`) and the neighbor tab whose position the new tab is
//! placed after. Each step takes the window state as it is *at that moment*,
//! never as it was when the tab was created.

use tabkeeper_daemon_protocol::{TabId, TabInfo, WindowId, END_INDEX};

use crate::settings::{OnOpen, Settings};
use crate::window_state::WindowState;

const SPEED_DIAL_SCHEME: &str = "opera:";
const SPEED_DIAL_HOST: &str = "startpage";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementDecision {
    Leave,
    AtEnd,
    NextToActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextToActivePlan {
    /// No history in the window yet; host placement stands.
    Skip,
    /// Look up the anchor tab, then pick the neighbor with [`resolve_anchor`].
    CheckAnchor(TabId),
    Neighbor(TabId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveTarget {
    pub index: i64,
    pub window_id: WindowId,
}

impl MoveTarget {
    pub fn end_of(window_id: WindowId) -> Self {
        Self {
            index: END_INDEX,
            window_id,
        }
    }
}

/// The host's built-in start page (`opera://startpage`).
pub fn is_speed_dial(tab: &TabInfo) -> bool {
    let Some(url) = tab.url.as_deref() else {
        return false;
    };
    let Some(rest) = url
        .strip_prefix(SPEED_DIAL_SCHEME)
        .and_then(|rest| rest.strip_prefix("//"))
    else {
        return false;
    };
    let host_end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#' | ':'))
        .unwrap_or(rest.len());
    rest[..host_end].eq_ignore_ascii_case(SPEED_DIAL_HOST)
}

/// Placement for a tab created in its own window.
pub fn decide_new_tab(on_open: OnOpen, tab: &TabInfo) -> PlacementDecision {
    match on_open {
        OnOpen::Default => PlacementDecision::Leave,
        OnOpen::NextToActive => PlacementDecision::NextToActive,
        OnOpen::AtEnd => PlacementDecision::AtEnd,
        OnOpen::OtherAtEnd => {
            if is_speed_dial(tab) {
                PlacementDecision::NextToActive
            } else {
                PlacementDecision::AtEnd
            }
        }
    }
}

/// Placement for a popup being pulled back into its opener's window.
/// This is the one case where `default` still moves the tab.
pub fn decide_rehome(on_open: OnOpen, tab: &TabInfo) -> PlacementDecision {
    match on_open {
        OnOpen::Default => {
            if is_speed_dial(tab) {
                PlacementDecision::AtEnd
            } else {
                PlacementDecision::NextToActive
            }
        }
        other => decide_new_tab(other, tab),
    }
}

/// First step of next-to-active placement in `state`'s window.
///
/// Without the anchor detour the anchor is advanced to the new tab right away.
pub fn plan_next_to_active(
    settings: &Settings,
    state: &mut WindowState,
    tab: &TabInfo,
) -> NextToActivePlan {
    if settings.open_in_order {
        if let Some(anchor) = state.in_order_anchor() {
            return NextToActivePlan::CheckAnchor(anchor);
        }
    }

    let neighbor = state.history().first();
    state.set_in_order_anchor(Some(tab.id));
    match neighbor {
        Some(neighbor) => NextToActivePlan::Neighbor(neighbor),
        None => NextToActivePlan::Skip,
    }
}

/// Second step of in-order placement, once the anchor lookup resolved.
///
/// The anchor only wins when the new tab was opened from the window's most
/// recent tab, checked against the state as it is now. Tabs opened from a
/// background tab keep the plain next-to-active neighbor. The anchor then
/// moves to the new tab either way.
pub fn resolve_anchor(
    state: &mut WindowState,
    tab: &TabInfo,
    anchor_tab: Option<&TabInfo>,
) -> Option<TabId> {
    let most_recent = state.history().first();
    let opened_from_active = tab.opener_tab_id.is_some() && tab.opener_tab_id == most_recent;

    let neighbor = match anchor_tab {
        Some(anchor) if opened_from_active => Some(anchor.id),
        _ => most_recent,
    };

    state.set_in_order_anchor(Some(tab.id));
    neighbor
}

/// Position right after `neighbor`, or `None` when `tab` is already there.
pub fn target_after(tab: &TabInfo, neighbor: &TabInfo) -> Option<MoveTarget> {
    if neighbor.id == tab.id {
        return None;
    }

    let target = MoveTarget {
        index: i64::from(neighbor.index) + 1,
        window_id: neighbor.window_id,
    };
    if i64::from(tab.index) == target.index && tab.window_id == target.window_id {
        return None;
    }
    Some(target)
}
