//! Extension points around `Session::commit`.
//!
//! A commit runs every registered hook's `before_commit`, applies the tracked
//! changes, then runs `after_commit` (or `after_rollback` when the apply
//! failed). Each hook gets its own [`TxnSlot`] for the lifetime of one commit;
//! slots are created per session and cleared once the commit finishes.

use std::any::Any;

use microblog_core::error::Result;

use crate::session::TrackedChanges;

pub type TxnId = u64;

pub trait CommitHook: Send + Sync {
    fn name(&self) -> &str;

    /// Inspect the tracked changes and stash whatever `after_commit` needs.
    /// An error is logged and the commit proceeds without this hook's state.
    fn before_commit(&self, txn: TxnId, changes: &TrackedChanges, slot: &mut TxnSlot) -> Result<()>;

    /// Runs only once the store has committed. Errors are reported, not retried.
    fn after_commit(&self, txn: TxnId, slot: &mut TxnSlot) -> Result<()>;

    fn after_rollback(&self, _txn: TxnId, slot: &mut TxnSlot) {
        slot.clear();
    }
}

/// Transaction-scoped storage owned by one hook.
#[derive(Default)]
pub struct TxnSlot {
    value: Option<Box<dyn Any + Send>>,
}

impl TxnSlot {
    pub fn put<T: Any + Send>(&mut self, value: T) {
        self.value = Some(Box::new(value));
    }

    /// Move the stashed value out, leaving the slot empty whatever its type was.
    pub fn take<T: Any>(&mut self) -> Option<T> {
        self.value.take().and_then(|v| v.downcast::<T>().ok()).map(|v| *v)
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_empties_slot_even_on_type_mismatch() {
        let mut slot = TxnSlot::default();
        slot.put(5u32);
        assert_eq!(slot.take::<String>(), None);
        assert!(slot.is_empty());

        slot.put(String::from("x"));
        assert_eq!(slot.take::<String>().as_deref(), Some("x"));
        assert!(slot.is_empty());
    }
}
