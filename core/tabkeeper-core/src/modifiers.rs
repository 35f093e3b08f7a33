//! Ctrl/shift state as relayed from page content.

use tabkeeper_daemon_protocol::{KeyAction, ModifierKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierKeys {
    pub ctrl: bool,
    pub shift: bool,
}

impl ModifierKeys {
    pub fn apply(&mut self, action: KeyAction, key: ModifierKey) {
        let down = action == KeyAction::Down;
        match key {
            ModifierKey::Ctrl => self.ctrl = down,
            ModifierKey::Shift => self.shift = down,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_independent() {
        let mut keys = ModifierKeys::default();
        keys.apply(KeyAction::Down, ModifierKey::Ctrl);
        keys.apply(KeyAction::Down, ModifierKey::Shift);
        keys.apply(KeyAction::Up, ModifierKey::Ctrl);
        assert_eq!(
            keys,
            ModifierKeys {
                ctrl: false,
                shift: true
            }
        );
    }

    #[test]
    fn repeated_down_stays_down_until_up() {
        let mut keys = ModifierKeys::default();
        keys.apply(KeyAction::Down, ModifierKey::Shift);
        keys.apply(KeyAction::Down, ModifierKey::Shift);
        assert!(keys.shift);
        keys.apply(KeyAction::Up, ModifierKey::Shift);
        assert!(!keys.shift);
    }
}
