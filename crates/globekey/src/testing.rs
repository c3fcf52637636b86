//! Scriptable in-memory backends for driving the managers in tests.
//!
//! Both fakes split into a backend half (owned by the worker thread
//! through the factory) and a cloneable handle half that tests keep to
//! inject events, script native failures, and inspect state.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use crossbeam_channel::Sender;
use keycomb::{Key, KeyCombination};
use parking_lot::Mutex;

use crate::{
    Error, Result,
    backend::{
        HotkeyId, ListenerBackend, ListenerFactory, RawKeyEvent, RegistryBackend, RegistryFactory,
    },
};

#[derive(Default)]
struct RegistryState {
    registered: HashMap<HotkeyId, (KeyCombination, bool)>,
    fired: VecDeque<HotkeyId>,
    fail_register: HashMap<KeyCombination, i32>,
    fail_unregister: HashMap<KeyCombination, i32>,
}

/// Cloneable handle for inspecting and scripting a [`FakeRegistry`].
#[derive(Clone, Default)]
pub struct FakeRegistryHandle {
    state: Arc<Mutex<RegistryState>>,
}

impl FakeRegistryHandle {
    /// Create a fresh handle with no registrations scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an activation as if the OS delivered one for `id`.
    pub fn fire(&self, id: HotkeyId) {
        self.state.lock().fired.push_back(id);
    }

    /// Queue an activation for the id currently registered for `kc`.
    /// Returns false when nothing is registered for it.
    pub fn fire_combination(&self, kc: &KeyCombination) -> bool {
        let mut state = self.state.lock();
        let id = state
            .registered
            .iter()
            .find(|(_, (registered, _))| registered == kc)
            .map(|(id, _)| *id);
        match id {
            Some(id) => {
                state.fired.push_back(id);
                true
            }
            None => false,
        }
    }

    /// The id currently registered for `kc`, if any.
    pub fn id_of(&self, kc: &KeyCombination) -> Option<HotkeyId> {
        self.state
            .lock()
            .registered
            .iter()
            .find(|(_, (registered, _))| registered == kc)
            .map(|(id, _)| *id)
    }

    /// True when `kc` is currently registered natively.
    pub fn is_registered(&self, kc: &KeyCombination) -> bool {
        self.id_of(kc).is_some()
    }

    /// The repeat attribute the registration for `kc` was made with.
    pub fn auto_repeat_of(&self, kc: &KeyCombination) -> Option<bool> {
        self.state
            .lock()
            .registered
            .values()
            .find(|(registered, _)| registered == kc)
            .map(|(_, auto_repeat)| *auto_repeat)
    }

    /// Number of live native registrations.
    pub fn registered_count(&self) -> usize {
        self.state.lock().registered.len()
    }

    /// Make every future `register` of `kc` fail with `code`.
    pub fn fail_register_with(&self, kc: KeyCombination, code: i32) {
        self.state.lock().fail_register.insert(kc, code);
    }

    /// Stop failing `register` calls for `kc`.
    pub fn clear_register_failure(&self, kc: &KeyCombination) {
        self.state.lock().fail_register.remove(kc);
    }

    /// Make every future `unregister` of `kc` fail with `code`.
    pub fn fail_unregister_with(&self, kc: KeyCombination, code: i32) {
        self.state.lock().fail_unregister.insert(kc, code);
    }
}

/// In-memory [`RegistryBackend`].
pub struct FakeRegistry {
    handle: FakeRegistryHandle,
}

impl FakeRegistry {
    /// Backend half for `handle`.
    pub fn new(handle: FakeRegistryHandle) -> Self {
        Self { handle }
    }

    /// Factory suitable for [`crate::RegisterManager::new`].
    pub fn factory(handle: FakeRegistryHandle) -> RegistryFactory {
        Arc::new(move || {
            Ok(Box::new(Self::new(handle.clone())) as Box<dyn RegistryBackend>)
        })
    }
}

impl RegistryBackend for FakeRegistry {
    fn register(&mut self, id: HotkeyId, kc: &KeyCombination, auto_repeat: bool) -> Result<()> {
        let mut state = self.handle.state.lock();
        if let Some(code) = state.fail_register.get(kc) {
            return Err(Error::NativeFailure(*code));
        }
        state.registered.insert(id, (*kc, auto_repeat));
        Ok(())
    }

    fn unregister(&mut self, id: HotkeyId) -> Result<()> {
        let mut state = self.handle.state.lock();
        let Some((kc, _)) = state.registered.get(&id).copied() else {
            return Err(Error::NativeFailure(1));
        };
        if let Some(code) = state.fail_unregister.get(&kc) {
            return Err(Error::NativeFailure(*code));
        }
        state.registered.remove(&id);
        Ok(())
    }

    fn next_fired(&mut self) -> Option<HotkeyId> {
        self.handle.state.lock().fired.pop_front()
    }
}

#[derive(Default)]
struct ListenerState {
    sink: Option<Sender<RawKeyEvent>>,
    installed: bool,
    fail_next_install: bool,
    fail_next_uninstall: Option<i32>,
}

/// Cloneable handle for driving a [`FakeListener`].
#[derive(Clone, Default)]
pub struct FakeListenerHandle {
    state: Arc<Mutex<ListenerState>>,
}

impl FakeListenerHandle {
    /// Create a fresh handle with no listener installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a raw transition to the installed listener. Returns
    /// false when no listener is installed.
    pub fn send(&self, code: i32, pressed: bool) -> bool {
        let state = self.state.lock();
        match &state.sink {
            Some(sink) => sink.send(RawKeyEvent { code, pressed }).is_ok(),
            None => false,
        }
    }

    /// Deliver a press for `key` using its portable code, matching
    /// [`keycomb::IdentityKeyMap`].
    pub fn press(&self, key: Key) -> bool {
        self.send(i32::from(key.code()), true)
    }

    /// Deliver a release for `key`.
    pub fn release(&self, key: Key) -> bool {
        self.send(i32::from(key.code()), false)
    }

    /// True while a listener is installed.
    pub fn installed(&self) -> bool {
        self.state.lock().installed
    }

    /// Fail the next `install` call with `ListenerStart`.
    pub fn fail_next_install(&self) {
        self.state.lock().fail_next_install = true;
    }

    /// Fail the next `uninstall` call with `NativeFailure(code)`.
    pub fn fail_next_uninstall(&self, code: i32) {
        self.state.lock().fail_next_uninstall = Some(code);
    }
}

/// In-memory [`ListenerBackend`].
pub struct FakeListener {
    handle: FakeListenerHandle,
}

impl FakeListener {
    /// Backend half for `handle`.
    pub fn new(handle: FakeListenerHandle) -> Self {
        Self { handle }
    }

    /// Factory suitable for [`crate::HookManager::new`].
    pub fn factory(handle: FakeListenerHandle) -> ListenerFactory {
        Arc::new(move || {
            Ok(Box::new(Self::new(handle.clone())) as Box<dyn ListenerBackend>)
        })
    }
}

impl ListenerBackend for FakeListener {
    fn install(&mut self, sink: Sender<RawKeyEvent>) -> Result<()> {
        let mut state = self.handle.state.lock();
        if state.fail_next_install {
            state.fail_next_install = false;
            return Err(Error::ListenerStart);
        }
        state.sink = Some(sink);
        state.installed = true;
        Ok(())
    }

    fn uninstall(&mut self) -> Result<()> {
        let mut state = self.handle.state.lock();
        state.sink = None;
        state.installed = false;
        if let Some(code) = state.fail_next_uninstall.take() {
            return Err(Error::NativeFailure(code));
        }
        Ok(())
    }
}
