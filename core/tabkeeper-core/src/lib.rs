//! # tabkeeper-core
//!
//! Per-window tab activation history and the tab placement / close-focus
//! policies built on top of it.
//!
//! ## Design Principles
//!
//! - **Sans-IO**: The engine never talks to the host directly. Every inbound
//!   message returns the host commands to issue; query results come back later
//!   as replies tagged with the request id that asked for them.
//! - **Single writer**: One message is handled at a time. Handlers only
//!   interleave across replies, so every continuation re-checks the state it
//!   depends on before acting.
//! - **Graceful degradation**: Unknown windows, vanished tabs and missing
//!   neighbors turn into no-ops, not errors.
//! - **Deterministic time**: Callers pass `now` in; nothing reads the clock.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tabkeeper_core::{Engine, Settings};
//!
//! let mut engine = Engine::new(Settings::default());
//! let commands = engine.start();
//! // send `commands` to the host, feed its events and replies back in
//! ```

pub mod cycle;
pub mod engine;
pub mod error;
pub mod history;
pub mod modifiers;
pub mod placement;
pub mod registry;
pub mod removal;
pub mod settings;
pub mod undo;
pub mod window_state;

pub use engine::Engine;
pub use error::{Result, TabkeeperError};
pub use history::HistoryList;
pub use modifiers::ModifierKeys;
pub use registry::WindowStateRegistry;
pub use settings::{
    default_settings_path, load_settings, FocusOnOpen, OnClose, OnOpen, Settings, SettingsStore,
};
pub use undo::UndoSlot;
pub use window_state::{IndexLookup, WindowState};
