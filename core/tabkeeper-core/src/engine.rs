//! Event dispatch: routes host events, query replies, relay messages and
//! keyboard commands to the per-window state and the placement/focus
//! policies, and returns the host commands to issue.
//!
//! Every host query is registered in a pending table keyed by request id,
//! together with the context it was issued for. Handlers interleave only
//! across those replies, so each continuation below re-reads current state
//! and drops itself when that state no longer supports the action.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tabkeeper_daemon_protocol::{
    HostCommand, HostEvent, HostMessage, KeyAction, ModifierKey, QueryResult, RequestId, TabId,
    TabInfo, TabQuery, WindowId, WindowInfo,
};
use tracing::{debug, error, info, warn};

use crate::cycle::{pick_cycle_target, CycleDirection};
use crate::modifiers::ModifierKeys;
use crate::placement::{
    decide_new_tab, decide_rehome, plan_next_to_active, resolve_anchor, target_after, MoveTarget,
    NextToActivePlan, PlacementDecision,
};
use crate::registry::WindowStateRegistry;
use crate::removal::{self, FocusChoice};
use crate::settings::{FocusOnOpen, Settings};
use crate::window_state::IndexLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterMove {
    Nothing,
    Focus,
}

/// Continuation for an outstanding host query.
#[derive(Debug, Clone)]
enum Pending {
    ActiveIndex {
        window_id: WindowId,
        lookup: IndexLookup,
    },
    Anchor {
        window_id: WindowId,
        tab: TabInfo,
        after: AfterMove,
    },
    Neighbor {
        tab: TabInfo,
        after: AfterMove,
    },
    Opener {
        tab: TabInfo,
    },
    MoveCompleted {
        tab_id: TabId,
    },
    TabAtIndex {
        window_id: WindowId,
        index: u32,
    },
    SeedWindows,
    SeedActiveTabs,
    CycleCurrent {
        direction: CycleDirection,
    },
    CycleWindow {
        direction: CycleDirection,
        current: TabInfo,
    },
}

pub struct Engine {
    settings: Settings,
    registry: WindowStateRegistry,
    modifiers: ModifierKeys,
    pending: HashMap<RequestId, Pending>,
    next_request_id: u64,
    last_activation: Option<DateTime<Utc>>,
    started: bool,
}

impl Engine {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            registry: WindowStateRegistry::new(),
            modifiers: ModifierKeys::default(),
            pending: HashMap::new(),
            next_request_id: 1,
            last_activation: None,
            started: false,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn registry(&self) -> &WindowStateRegistry {
        &self.registry
    }

    pub fn modifiers(&self) -> ModifierKeys {
        self.modifiers
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Begins consuming host events and rebuilds window state from the
    /// host's live windows and active tabs.
    pub fn start(&mut self) -> Vec<HostCommand> {
        let mut out = Vec::new();
        if self.started {
            warn!("Engine already started");
            return out;
        }
        self.started = true;
        info!("Engine started; seeding window state");
        self.request(&mut out, Pending::SeedWindows, |request_id| {
            HostCommand::QueryWindows { request_id }
        });
        out
    }

    pub fn handle_message(&mut self, message: HostMessage, now: DateTime<Utc>) -> Vec<HostCommand> {
        match message {
            HostMessage::Event { event } => self.handle_event(event, now),
            HostMessage::Reply { request_id, result } => self.handle_reply(request_id, result),
            HostMessage::Relay { action, key } => {
                self.handle_relay(action, key);
                Vec::new()
            }
            HostMessage::Command { name } => self.handle_command(&name),
            HostMessage::ReloadSettings => {
                // The engine holds no settings source; the daemon swaps settings in.
                debug!("Ignoring settings reload without a settings source");
                Vec::new()
            }
        }
    }

    pub fn handle_event(&mut self, event: HostEvent, now: DateTime<Utc>) -> Vec<HostCommand> {
        let mut out = Vec::new();
        if !self.started {
            debug!(kind = event.kind(), "Dropping host event received before startup");
            return out;
        }

        match event {
            HostEvent::WindowCreated { window } => self.on_window_created(window, &mut out),
            HostEvent::WindowRemoved { window_id } => {
                if self.registry.delete(window_id) {
                    debug!(window_id = %window_id, "Window removed");
                }
            }
            HostEvent::TabCreated { tab } => self.on_tab_created(tab, &mut out),
            HostEvent::TabRemoved { tab_id, window_id } => {
                self.on_tab_removed(tab_id, window_id, now, &mut out)
            }
            HostEvent::TabActivated { tab_id, window_id } => {
                let state = self.registry.get(window_id);
                let lookup = state.add(tab_id);
                debug!(
                    window_id = %window_id,
                    tab_id = %tab_id,
                    history = ?state.history().items(),
                    "Tab activated"
                );
                self.last_activation = Some(now);
                self.request_index(window_id, lookup, &mut out);
            }
            HostEvent::TabMoved {
                window_id,
                from_index,
                to_index,
                ..
            } => {
                if self.registry.get(window_id).track_move(from_index, to_index) {
                    debug!(
                        window_id = %window_id,
                        from_index,
                        to_index,
                        "Active tab moved"
                    );
                }
            }
            HostEvent::TabAttached {
                tab_id,
                new_window_id,
                ..
            } => {
                let lookup = self.registry.get(new_window_id).add(tab_id);
                debug!(window_id = %new_window_id, tab_id = %tab_id, "Tab attached");
                self.request_index(new_window_id, lookup, &mut out);
            }
            HostEvent::TabDetached {
                tab_id,
                old_window_id,
                ..
            } => {
                self.registry.get(old_window_id).remove(tab_id);
                debug!(window_id = %old_window_id, tab_id = %tab_id, "Tab detached");
            }
        }

        out
    }

    pub fn handle_reply(&mut self, request_id: RequestId, result: QueryResult) -> Vec<HostCommand> {
        let mut out = Vec::new();
        let Some(pending) = self.pending.remove(&request_id) else {
            warn!(request_id = %request_id, kind = result.kind(), "Reply for unknown request");
            return out;
        };

        match pending {
            Pending::ActiveIndex { window_id, lookup } => {
                let index = expect_tab(request_id, result).map(|tab| tab.index);
                match self.registry.get_existing_mut(window_id) {
                    Some(state) => {
                        if state.resolve_index(lookup, index) {
                            debug!(
                                window_id = %window_id,
                                tab_id = %lookup.tab_id,
                                index = ?index,
                                "Active index updated"
                            );
                        }
                    }
                    None => {
                        debug!(window_id = %window_id, "Window closed before active index resolved")
                    }
                }
            }
            Pending::Anchor {
                window_id,
                tab,
                after,
            } => {
                let anchor_tab = expect_tab(request_id, result);
                let Some(state) = self.registry.get_existing_mut(window_id) else {
                    debug!(window_id = %window_id, "Window closed before anchor resolved");
                    return out;
                };
                match resolve_anchor(state, &tab, anchor_tab.as_ref()) {
                    Some(neighbor) => self.lookup_neighbor(tab, neighbor, after, &mut out),
                    None => debug!(tab_id = %tab.id, "No neighbor for in-order placement"),
                }
            }
            Pending::Neighbor { tab, after } => {
                let Some(neighbor) = expect_tab(request_id, result) else {
                    debug!(tab_id = %tab.id, "Neighbor tab vanished; leaving placement");
                    return out;
                };
                match target_after(&tab, &neighbor) {
                    Some(target) => {
                        debug!(
                            tab_id = %tab.id,
                            neighbor = %neighbor.id,
                            index = target.index,
                            window_id = %target.window_id,
                            "Placing tab next to neighbor"
                        );
                        self.move_tab(&mut out, tab.id, target, after);
                    }
                    None => debug!(tab_id = %tab.id, "Tab already next to its neighbor"),
                }
            }
            Pending::Opener { tab } => {
                let Some(opener) = expect_tab(request_id, result) else {
                    debug!(tab_id = %tab.id, "Opener vanished; leaving popup alone");
                    return out;
                };
                if opener.window_id == tab.window_id {
                    return out;
                }
                info!(
                    tab_id = %tab.id,
                    from_window = %tab.window_id,
                    to_window = %opener.window_id,
                    "Moving popup back to its opener's window"
                );
                match decide_rehome(self.settings.on_open, &tab) {
                    PlacementDecision::Leave => {}
                    PlacementDecision::AtEnd => self.move_tab(
                        &mut out,
                        tab.id,
                        MoveTarget::end_of(opener.window_id),
                        AfterMove::Focus,
                    ),
                    PlacementDecision::NextToActive => {
                        self.begin_next_to_active(tab, opener.window_id, AfterMove::Focus, &mut out)
                    }
                }
            }
            Pending::MoveCompleted { tab_id } => match expect_moved(request_id, result) {
                Some(_) => out.push(HostCommand::FocusTab { tab_id }),
                None => debug!(tab_id = %tab_id, "Move failed; not focusing"),
            },
            Pending::TabAtIndex { window_id, index } => {
                match expect_tabs(request_id, result).first() {
                    Some(tab) => out.push(HostCommand::FocusTab { tab_id: tab.id }),
                    None => debug!(
                        window_id = %window_id,
                        index,
                        "No tab at index (rightmost tab closed?)"
                    ),
                }
            }
            Pending::SeedWindows => {
                let windows = expect_windows(request_id, result);
                let created = self.registry.seed_windows(&windows);
                info!(windows = windows.len(), created, "Seeded window states");
                self.request(&mut out, Pending::SeedActiveTabs, |request_id| {
                    HostCommand::QueryTabs {
                        request_id,
                        query: TabQuery::active(),
                    }
                });
            }
            Pending::SeedActiveTabs => {
                let tabs = expect_tabs(request_id, result);
                info!(active_tabs = tabs.len(), "Seeded active tabs");
                for (window_id, lookup) in self.registry.seed_active_tabs(&tabs) {
                    self.request_index(window_id, lookup, &mut out);
                }
            }
            Pending::CycleCurrent { direction } => {
                let Some(current) = expect_tabs(request_id, result).into_iter().next() else {
                    return out;
                };
                let window_id = current.window_id;
                self.request(
                    &mut out,
                    Pending::CycleWindow { direction, current },
                    |request_id| HostCommand::QueryTabs {
                        request_id,
                        query: TabQuery::in_window(window_id),
                    },
                );
            }
            Pending::CycleWindow { direction, current } => {
                let tabs = expect_tabs(request_id, result);
                if let Some(tab_id) = pick_cycle_target(direction, &current, &tabs) {
                    out.push(HostCommand::FocusTab { tab_id });
                }
            }
        }

        out
    }

    pub fn handle_relay(&mut self, action: KeyAction, key: u32) {
        match ModifierKey::from_code(key) {
            Some(key) => self.modifiers.apply(action, key),
            None => warn!(key, "Ignoring relay for unknown key"),
        }
    }

    pub fn handle_command(&mut self, name: &str) -> Vec<HostCommand> {
        let mut out = Vec::new();
        let Some(direction) = CycleDirection::from_command(name) else {
            error!(command = name, "Unknown keyboard command");
            return out;
        };
        self.request(&mut out, Pending::CycleCurrent { direction }, |request_id| {
            HostCommand::QueryTabs {
                request_id,
                query: TabQuery::active_in_current_window(),
            }
        });
        out
    }

    fn on_window_created(&mut self, window: WindowInfo, out: &mut Vec<HostCommand>) {
        let window_id = window.id;
        let state = self.registry.get(window_id);
        let lookups: Vec<IndexLookup> = window
            .tabs
            .unwrap_or_default()
            .iter()
            .filter(|tab| tab.active)
            .map(|tab| state.add(tab.id))
            .collect();
        debug!(
            window_id = %window_id,
            history = ?state.history().items(),
            "Window created"
        );
        for lookup in lookups {
            self.request_index(window_id, lookup, out);
        }
    }

    fn on_tab_created(&mut self, tab: TabInfo, out: &mut Vec<HostCommand>) {
        debug!(
            tab_id = %tab.id,
            window_id = %tab.window_id,
            index = tab.index,
            opener = ?tab.opener_tab_id,
            "Tab created"
        );

        match decide_new_tab(self.settings.on_open, &tab) {
            PlacementDecision::Leave => {}
            PlacementDecision::AtEnd => {
                let target = MoveTarget::end_of(tab.window_id);
                self.move_tab(out, tab.id, target, AfterMove::Nothing);
            }
            PlacementDecision::NextToActive => {
                let window_id = tab.window_id;
                self.begin_next_to_active(tab.clone(), window_id, AfterMove::Nothing, out);
            }
        }

        if let Some(opener_id) = tab.opener_tab_id {
            if self.settings.suppresses_popup(self.modifiers.shift) {
                self.request(out, Pending::Opener { tab: tab.clone() }, |request_id| {
                    HostCommand::GetTab {
                        request_id,
                        tab_id: opener_id,
                    }
                });
            }
        }

        if self.should_focus_new_tab(&tab) {
            out.push(HostCommand::FocusTab { tab_id: tab.id });
        }
    }

    fn should_focus_new_tab(&self, tab: &TabInfo) -> bool {
        if self.settings.focus_on_open != FocusOnOpen::Always
            || tab.active
            || tab.opener_tab_id.is_none()
        {
            return false;
        }
        let held_exception = (self.settings.except_ctrl && self.modifiers.ctrl)
            || (self.settings.except_shift && self.modifiers.shift);
        if held_exception {
            debug!(tab_id = %tab.id, "Exception key held; leaving new tab in background");
        }
        !held_exception
    }

    fn on_tab_removed(
        &mut self,
        tab_id: TabId,
        window_id: WindowId,
        now: DateTime<Utc>,
        out: &mut Vec<HostCommand>,
    ) {
        let activation_recent = self.activation_recent(now);
        let state = self.registry.get(window_id);
        let choice = removal::on_tab_removed(
            self.settings.on_close,
            state,
            window_id,
            tab_id,
            activation_recent,
        );
        debug!(
            window_id = %window_id,
            tab_id = %tab_id,
            activation_recent,
            choice = ?choice,
            "Tab removed"
        );

        match choice {
            FocusChoice::Keep => {}
            FocusChoice::Tab(tab_id) => out.push(HostCommand::FocusTab { tab_id }),
            FocusChoice::TabAtIndex { window_id, index } => {
                self.request(out, Pending::TabAtIndex { window_id, index }, |request_id| {
                    HostCommand::QueryTabs {
                        request_id,
                        query: TabQuery::at_index(window_id, index),
                    }
                });
            }
        }
    }

    fn activation_recent(&self, now: DateTime<Utc>) -> bool {
        self.last_activation
            .map(|at| now.signed_duration_since(at) < self.settings.active_changed_timeout())
            .unwrap_or(false)
    }

    fn begin_next_to_active(
        &mut self,
        tab: TabInfo,
        window_id: WindowId,
        after: AfterMove,
        out: &mut Vec<HostCommand>,
    ) {
        let state = self.registry.get(window_id);
        match plan_next_to_active(&self.settings, state, &tab) {
            NextToActivePlan::Skip => {
                debug!(tab_id = %tab.id, window_id = %window_id, "No active tab to place next to")
            }
            NextToActivePlan::Neighbor(neighbor) => self.lookup_neighbor(tab, neighbor, after, out),
            NextToActivePlan::CheckAnchor(anchor) => {
                self.request(
                    out,
                    Pending::Anchor {
                        window_id,
                        tab,
                        after,
                    },
                    |request_id| HostCommand::GetTab {
                        request_id,
                        tab_id: anchor,
                    },
                );
            }
        }
    }

    fn lookup_neighbor(
        &mut self,
        tab: TabInfo,
        neighbor: TabId,
        after: AfterMove,
        out: &mut Vec<HostCommand>,
    ) {
        self.request(out, Pending::Neighbor { tab, after }, |request_id| {
            HostCommand::GetTab {
                request_id,
                tab_id: neighbor,
            }
        });
    }

    fn move_tab(
        &mut self,
        out: &mut Vec<HostCommand>,
        tab_id: TabId,
        target: MoveTarget,
        after: AfterMove,
    ) {
        match after {
            AfterMove::Nothing => out.push(HostCommand::MoveTab {
                request_id: None,
                tab_id,
                index: target.index,
                window_id: target.window_id,
            }),
            AfterMove::Focus => {
                self.request(out, Pending::MoveCompleted { tab_id }, |request_id| {
                    HostCommand::MoveTab {
                        request_id: Some(request_id),
                        tab_id,
                        index: target.index,
                        window_id: target.window_id,
                    }
                });
            }
        }
    }

    fn request_index(
        &mut self,
        window_id: WindowId,
        lookup: IndexLookup,
        out: &mut Vec<HostCommand>,
    ) {
        // A newer lookup supersedes any unanswered one for the same window.
        self.pending.retain(|_, pending| {
            !matches!(pending, Pending::ActiveIndex { window_id: other, .. } if *other == window_id)
        });
        let tab_id = lookup.tab_id;
        self.request(
            out,
            Pending::ActiveIndex { window_id, lookup },
            |request_id| HostCommand::GetTab { request_id, tab_id },
        );
    }

    fn request(
        &mut self,
        out: &mut Vec<HostCommand>,
        pending: Pending,
        build: impl FnOnce(RequestId) -> HostCommand,
    ) {
        let request_id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        self.pending.insert(request_id, pending);
        out.push(build(request_id));
    }
}

fn expect_tab(request_id: RequestId, result: QueryResult) -> Option<TabInfo> {
    match result {
        QueryResult::Tab { tab } => tab,
        other => {
            warn!(request_id = %request_id, kind = other.kind(), "Expected a tab reply");
            None
        }
    }
}

fn expect_moved(request_id: RequestId, result: QueryResult) -> Option<TabInfo> {
    match result {
        QueryResult::Moved { tab } => tab,
        other => {
            warn!(request_id = %request_id, kind = other.kind(), "Expected a move reply");
            None
        }
    }
}

fn expect_tabs(request_id: RequestId, result: QueryResult) -> Vec<TabInfo> {
    match result {
        QueryResult::Tabs { tabs } => tabs,
        other => {
            warn!(request_id = %request_id, kind = other.kind(), "Expected a tab list reply");
            Vec::new()
        }
    }
}

fn expect_windows(request_id: RequestId, result: QueryResult) -> Vec<WindowInfo> {
    match result {
        QueryResult::Windows { windows } => windows,
        other => {
            warn!(request_id = %request_id, kind = other.kind(), "Expected a window list reply");
            Vec::new()
        }
    }
}
