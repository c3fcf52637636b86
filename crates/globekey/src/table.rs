//! Shared callback table keyed by key combination.
//!
//! One lock guards the whole table. Callbacks are cloned out of the
//! lock before invocation, so a running callback may query the manager
//! (e.g. `has`) without deadlocking on this lock.

use std::{collections::HashMap, sync::Arc};

use keycomb::KeyCombination;
use parking_lot::Mutex;

use crate::keystate::EntryView;

/// Callback invoked on the worker thread when a hotkey fires.
pub type HotkeyCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// One registered hotkey: repeat behavior plus the callback.
#[derive(Clone)]
pub(crate) struct HotkeyEntry {
    pub(crate) auto_repeat: bool,
    pub(crate) callback: HotkeyCallback,
}

/// Mapping from combination to entry; at most one entry per
/// combination.
#[derive(Default)]
pub(crate) struct CallbackTable {
    entries: Mutex<HashMap<KeyCombination, HotkeyEntry>>,
}

impl CallbackTable {
    pub(crate) fn contains(&self, kc: &KeyCombination) -> bool {
        self.entries.lock().contains_key(kc)
    }

    pub(crate) fn insert(&self, kc: KeyCombination, entry: HotkeyEntry) {
        self.entries.lock().insert(kc, entry);
    }

    pub(crate) fn remove(&self, kc: &KeyCombination) -> bool {
        self.entries.lock().remove(kc).is_some()
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Move the entry under `old` to `new`, dropping any entry that
    /// was under `new`.
    pub(crate) fn rekey(&self, old: &KeyCombination, new: KeyCombination) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.remove(old) {
            entries.insert(new, entry);
        }
    }

    pub(crate) fn set_auto_repeat(&self, kc: &KeyCombination, auto_repeat: bool) -> bool {
        match self.entries.lock().get_mut(kc) {
            Some(entry) => {
                entry.auto_repeat = auto_repeat;
                true
            }
            None => false,
        }
    }

    pub(crate) fn auto_repeat(&self, kc: &KeyCombination) -> Option<bool> {
        self.entries.lock().get(kc).map(|entry| entry.auto_repeat)
    }

    /// Clone the callback for `kc` out of the lock.
    pub(crate) fn callback(&self, kc: &KeyCombination) -> Option<HotkeyCallback> {
        self.entries.lock().get(kc).map(|entry| Arc::clone(&entry.callback))
    }

    /// Entry attributes plus a cloned callback, for firing decisions.
    pub(crate) fn lookup(&self, kc: &KeyCombination) -> Option<(EntryView, HotkeyCallback)> {
        self.entries.lock().get(kc).map(|entry| {
            (
                EntryView {
                    auto_repeat: entry.auto_repeat,
                },
                Arc::clone(&entry.callback),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(auto_repeat: bool) -> HotkeyEntry {
        HotkeyEntry {
            auto_repeat,
            callback: Arc::new(|| {}),
        }
    }

    fn kc(spec: &str) -> KeyCombination {
        KeyCombination::parse(spec).expect("combination")
    }

    #[test]
    fn insert_and_lookup() {
        let table = CallbackTable::default();
        let k = kc("ctrl+j");
        assert!(!table.contains(&k));
        table.insert(k, entry(true));
        assert!(table.contains(&k));
        let (view, _cb) = table.lookup(&k).expect("entry");
        assert!(view.auto_repeat);
        assert_eq!(table.auto_repeat(&k), Some(true));
    }

    #[test]
    fn rekey_moves_entry() {
        let table = CallbackTable::default();
        let old = kc("ctrl+j");
        let new = kc("ctrl+k");
        table.insert(old, entry(true));
        table.rekey(&old, new);
        assert!(!table.contains(&old));
        assert_eq!(table.auto_repeat(&new), Some(true));
    }

    #[test]
    fn set_auto_repeat_requires_presence() {
        let table = CallbackTable::default();
        let k = kc("ctrl+j");
        assert!(!table.set_auto_repeat(&k, true));
        table.insert(k, entry(false));
        assert!(table.set_auto_repeat(&k, true));
        assert_eq!(table.auto_repeat(&k), Some(true));
    }
}
