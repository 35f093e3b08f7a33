//! Wire protocol types and validation for tabkeeper-daemon.
//!
//! The daemon talks to the host bridge over newline-delimited JSON: host
//! events, query replies, modifier relay messages and keyboard commands come
//! in on stdin, and host commands go out on stdout. This crate is shared by
//! the daemon and its bridges so both sides agree on the schema.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024; // 1MB

/// Move target index meaning "after the last tab".
pub const END_INDEX: i64 = -1;

/// Relay key codes forwarded by the content-side key listener.
pub const SHIFT_KEY: u32 = 16;
pub const CTRL_KEY: u32 = 17;

/// Opaque host-assigned tab handle. May be reused after the tab is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub u32);

/// Correlates an outbound query with the reply that answers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub window_id: WindowId,
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabs: Option<Vec<TabInfo>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    WindowCreated {
        window: WindowInfo,
    },
    WindowRemoved {
        window_id: WindowId,
    },
    TabCreated {
        tab: TabInfo,
    },
    TabRemoved {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
    },
    TabMoved {
        tab_id: TabId,
        window_id: WindowId,
        from_index: u32,
        to_index: u32,
    },
    TabAttached {
        tab_id: TabId,
        new_window_id: WindowId,
        #[serde(default)]
        new_position: Option<u32>,
    },
    TabDetached {
        tab_id: TabId,
        old_window_id: WindowId,
        #[serde(default)]
        old_position: Option<u32>,
    },
}

impl HostEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::WindowCreated { .. } => "window_created",
            HostEvent::WindowRemoved { .. } => "window_removed",
            HostEvent::TabCreated { .. } => "tab_created",
            HostEvent::TabRemoved { .. } => "tab_removed",
            HostEvent::TabActivated { .. } => "tab_activated",
            HostEvent::TabMoved { .. } => "tab_moved",
            HostEvent::TabAttached { .. } => "tab_attached",
            HostEvent::TabDetached { .. } => "tab_detached",
        }
    }
}

/// Answer to an outbound query. Host failures arrive as `tab: null` or an
/// empty list rather than as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryResult {
    Tab {
        #[serde(default)]
        tab: Option<TabInfo>,
    },
    Tabs {
        #[serde(default)]
        tabs: Vec<TabInfo>,
    },
    Windows {
        #[serde(default)]
        windows: Vec<WindowInfo>,
    },
    Moved {
        #[serde(default)]
        tab: Option<TabInfo>,
    },
}

impl QueryResult {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryResult::Tab { .. } => "tab",
            QueryResult::Tabs { .. } => "tabs",
            QueryResult::Windows { .. } => "windows",
            QueryResult::Moved { .. } => "moved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKey {
    Ctrl,
    Shift,
}

impl ModifierKey {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            CTRL_KEY => Some(ModifierKey::Ctrl),
            SHIFT_KEY => Some(ModifierKey::Shift),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum HostMessage {
    Event {
        event: HostEvent,
    },
    Reply {
        request_id: RequestId,
        result: QueryResult,
    },
    Relay {
        action: KeyAction,
        key: u32,
    },
    Command {
        name: String,
    },
    /// The settings file changed; re-read it.
    ReloadSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_window: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl TabQuery {
    pub fn active() -> Self {
        Self {
            active: Some(true),
            ..Self::default()
        }
    }

    pub fn active_in_current_window() -> Self {
        Self {
            active: Some(true),
            current_window: Some(true),
            ..Self::default()
        }
    }

    pub fn in_window(window_id: WindowId) -> Self {
        Self {
            window_id: Some(window_id),
            ..Self::default()
        }
    }

    pub fn at_index(window_id: WindowId, index: u32) -> Self {
        Self {
            window_id: Some(window_id),
            index: Some(index),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum HostCommand {
    QueryWindows {
        request_id: RequestId,
    },
    QueryTabs {
        request_id: RequestId,
        query: TabQuery,
    },
    GetTab {
        request_id: RequestId,
        tab_id: TabId,
    },
    MoveTab {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
        tab_id: TabId,
        index: i64,
        window_id: WindowId,
    },
    FocusTab {
        tab_id: TabId,
    },
}

impl HostCommand {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            HostCommand::QueryWindows { request_id }
            | HostCommand::QueryTabs { request_id, .. }
            | HostCommand::GetTab { request_id, .. } => Some(*request_id),
            HostCommand::MoveTab { request_id, .. } => *request_id,
            HostCommand::FocusTab { .. } => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl HostMessage {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        match self {
            HostMessage::Event { event } => validate_event(event),
            HostMessage::Reply { .. } => Ok(()),
            HostMessage::Relay { key, .. } => {
                if ModifierKey::from_code(*key).is_none() {
                    return Err(ErrorInfo::new(
                        "unknown_key",
                        format!("relay key {} is not ctrl or shift", key),
                    ));
                }
                Ok(())
            }
            HostMessage::Command { name } => require_string(name, "name"),
            HostMessage::ReloadSettings => Ok(()),
        }
    }
}

/// Parses one line of bridge input. Leading and trailing whitespace is ignored.
pub fn parse_host_message(line: &[u8]) -> Result<HostMessage, ErrorInfo> {
    if line.len() > MAX_MESSAGE_BYTES {
        return Err(ErrorInfo::new(
            "request_too_large",
            "message exceeded maximum size",
        ));
    }

    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ErrorInfo::new("empty_message", "message body was empty"));
    }

    let message: HostMessage = serde_json::from_slice(line).map_err(|err| {
        ErrorInfo::new(
            "invalid_json",
            format!("message was not valid JSON: {}", err),
        )
    })?;
    message.validate()?;
    Ok(message)
}

fn validate_event(event: &HostEvent) -> Result<(), ErrorInfo> {
    match event {
        HostEvent::WindowCreated { window } => {
            if let Some(tabs) = &window.tabs {
                for tab in tabs {
                    require_same_window(tab, window.id)?;
                }
            }
            Ok(())
        }
        HostEvent::TabCreated { tab } => {
            if tab.opener_tab_id == Some(tab.id) {
                return Err(ErrorInfo::new(
                    "invalid_opener",
                    "a tab cannot be its own opener",
                ));
            }
            Ok(())
        }
        HostEvent::WindowRemoved { .. }
        | HostEvent::TabRemoved { .. }
        | HostEvent::TabActivated { .. }
        | HostEvent::TabMoved { .. }
        | HostEvent::TabAttached { .. }
        | HostEvent::TabDetached { .. } => Ok(()),
    }
}

fn require_same_window(tab: &TabInfo, window_id: WindowId) -> Result<(), ErrorInfo> {
    if tab.window_id != window_id {
        return Err(ErrorInfo::new(
            "window_mismatch",
            format!("tab {} listed under window {}", tab.id, window_id),
        ));
    }
    Ok(())
}

fn require_string(value: &str, field: &str) -> Result<(), ErrorInfo> {
    if value.trim().is_empty() {
        return Err(ErrorInfo::new(
            "missing_field",
            format!("{} is required", field),
        ));
    }
    Ok(())
}
