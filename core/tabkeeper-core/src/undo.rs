//! Single-depth undo slot shared by history, in-order anchor and active index.

/// A value plus the one value it held before the last recorded change.
///
/// `restore` copies the shadow back without discarding it, so restoring twice
/// in a row lands on the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoSlot<T> {
    current: T,
    previous: T,
}

impl<T: Clone> UndoSlot<T> {
    pub fn new(value: T) -> Self {
        Self {
            previous: value.clone(),
            current: value,
        }
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    pub fn previous(&self) -> &T {
        &self.previous
    }

    /// Shadows the current value, then overwrites it.
    pub fn set(&mut self, value: T) {
        self.previous = std::mem::replace(&mut self.current, value);
    }

    /// Records the current value as the undo point without changing it.
    pub fn snapshot(&mut self) {
        self.previous = self.current.clone();
    }

    /// Mutable access that does not touch the shadow.
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    pub fn restore(&mut self) {
        self.current = self.previous.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_shadows_previous_value() {
        let mut slot = UndoSlot::new(Some(1u32));
        slot.set(Some(2));
        assert_eq!(slot.get(), &Some(2));
        assert_eq!(slot.previous(), &Some(1));
    }

    #[test]
    fn restore_is_idempotent() {
        let mut slot = UndoSlot::new(0u32);
        slot.set(5);
        slot.set(7);
        slot.restore();
        assert_eq!(*slot.get(), 5);
        slot.restore();
        assert_eq!(*slot.get(), 5);
    }

    #[test]
    fn current_mut_leaves_shadow_alone() {
        let mut slot = UndoSlot::new(vec![1u32]);
        slot.snapshot();
        slot.current_mut().push(2);
        assert_eq!(slot.previous(), &vec![1]);
        slot.restore();
        assert_eq!(slot.get(), &vec![1]);
    }
}
