//! A resettable, thread-safe memoisation slot.
//!
//! A single write-exclusive guard protects the raw trit buffer, and each
//! field gets one of these slots for memoisation — a `OnceLock` that can be
//! wholesale replaced (hence the outer `RwLock`) when a setter invalidates
//! it, rather than a per-field mutex with double-checked locking around the
//! decode.

use std::sync::{OnceLock, RwLock};

pub struct Memo<T>(RwLock<OnceLock<T>>);

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self(RwLock::new(OnceLock::new()))
    }
}

impl<T: Clone> Memo<T> {
    /// Return the memoised value, computing and caching it with `f` if
    /// absent. Concurrent callers racing to fill an empty slot all see the
    /// same winner's value (the `OnceLock` contract), but unlike a bare
    /// `OnceLock`, this slot can later be reset via [`Memo::invalidate`].
    pub fn get_or_init(&self, f: impl FnOnce() -> T) -> T {
        let guard = self.0.read().expect("memo lock poisoned");
        guard.get_or_init(f).clone()
    }

    /// Force the slot to hold `value`, overwriting whatever was memoised.
    pub fn set(&self, value: T) {
        let mut guard = self.0.write().expect("memo lock poisoned");
        *guard = OnceLock::new();
        let _ = guard.set(value);
    }

    /// Clear the slot so the next read recomputes from scratch.
    pub fn invalidate(&self) {
        let mut guard = self.0.write().expect("memo lock poisoned");
        *guard = OnceLock::new();
    }
}
