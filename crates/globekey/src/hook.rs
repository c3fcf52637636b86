//! Manager that installs a low-level keyboard listener and matches
//! combinations itself.
//!
//! The worker thread installs the listener on itself, drains raw key
//! transitions in bounded batches, feeds them through the
//! [`crate::keystate`] tracker, and invokes matched callbacks inline.
//! Table mutations happen directly under the table lock (no native
//! call is involved per entry), so no task round-trip is needed; the
//! running-state and calling-thread checks still apply.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use keycomb::{Key, KeyCombination, KeyMap};
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    Error, Result,
    backend::{ListenerFactory, RawKeyEvent},
    keystate::{self, KeyState},
    table::{CallbackTable, HotkeyCallback, HotkeyEntry},
    worker::{Control, Pacer, RunState, WorkerConfig},
};

/// Default debounce window in milliseconds; `0` disables debouncing.
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// Which raw transition a key listener observes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeyEventKind {
    /// Key-down transitions, including OS auto-repeat.
    Pressed,
    /// Key-up transitions.
    Released,
}

/// State shared between the facade and the worker thread.
struct Shared {
    table: CallbackTable,
    /// Raw per-key observers, independent of the combination table.
    key_listeners: Mutex<HashMap<(Key, KeyEventKind), HotkeyCallback>>,
    debounce_ms: AtomicU64,
    should_close: AtomicBool,
    /// Uninstall failure recorded by the worker for `end` to surface.
    teardown: Mutex<Option<Error>>,
    config: WorkerConfig,
}

/// Global hotkey manager backed by a low-level keyboard listener.
///
/// Construct one instance per process and share it behind an `Arc`.
/// Matching runs in user code on the worker thread, so entries work on
/// platforms without a native registration API; auto-repeat and chord
/// settling are handled by the debounce policy rather than the OS.
pub struct HookManager {
    shared: Arc<Shared>,
    factory: ListenerFactory,
    keymap: Arc<dyn KeyMap>,
    control: Mutex<Control>,
}

impl HookManager {
    /// Create a manager with default worker tuning. The factory runs
    /// on the worker thread at every `start`; `keymap` translates the
    /// listener's raw codes.
    pub fn new(factory: ListenerFactory, keymap: Arc<dyn KeyMap>) -> Self {
        Self::with_config(factory, keymap, WorkerConfig::default())
    }

    /// Create a manager with explicit worker tuning.
    pub fn with_config(
        factory: ListenerFactory,
        keymap: Arc<dyn KeyMap>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: CallbackTable::default(),
                key_listeners: Mutex::new(HashMap::new()),
                debounce_ms: AtomicU64::new(DEFAULT_DEBOUNCE_MS),
                should_close: AtomicBool::new(false),
                teardown: Mutex::new(None),
                config,
            }),
            factory,
            keymap,
            control: Mutex::new(Control::new()),
        }
    }

    /// Install the listener and begin processing. Idempotent: a
    /// running manager returns success without spawning again.
    pub fn start(&self) -> Result<()> {
        let mut control = self.control.lock();
        match control.state {
            RunState::Running => return Ok(()),
            RunState::Starting | RunState::Stopping => return Err(Error::WrongManagerState),
            RunState::Stopped => {}
        }
        control.state = RunState::Starting;
        self.shared.should_close.store(false, Ordering::Release);
        *self.shared.teardown.lock() = None;

        let (ready_tx, ready_rx) = bounded(1);
        let shared = Arc::clone(&self.shared);
        let factory = Arc::clone(&self.factory);
        let keymap = Arc::clone(&self.keymap);
        let spawned = thread::Builder::new()
            .name("globekey-hook".into())
            .spawn(move || run_worker(&shared, &factory, keymap.as_ref(), &ready_tx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                control.state = RunState::Stopped;
                return Err(Error::WorkerStart(e.to_string()));
            }
        };
        match ready_rx.recv() {
            Ok(Ok(())) => {
                control.worker_thread = Some(handle.thread().id());
                control.worker = Some(handle);
                control.state = RunState::Running;
                debug!("hook_manager_started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                control.state = RunState::Stopped;
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                control.state = RunState::Stopped;
                Err(Error::WorkerStart(
                    "worker exited before signalling readiness".into(),
                ))
            }
        }
    }

    /// Register `kc` and invoke `callback` whenever the tracked key
    /// state matches it. With `auto_repeat` false, a held combination
    /// fires only on its initial transition.
    pub fn add(
        &self,
        kc: KeyCombination,
        auto_repeat: bool,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        self.check_mutate()?;
        if !kc.is_valid() {
            return Err(Error::InvalidValue);
        }
        if self.shared.table.contains(&kc) {
            return Err(Error::DuplicateEntry);
        }
        self.shared.table.insert(
            kc,
            HotkeyEntry {
                auto_repeat,
                callback: Arc::new(callback),
            },
        );
        trace!(%kc, auto_repeat, "hotkey_added");
        Ok(())
    }

    /// Remove the entry for `kc`.
    pub fn remove(&self, kc: KeyCombination) -> Result<()> {
        self.check_mutate()?;
        if !self.shared.table.remove(&kc) {
            return Err(Error::NotFound);
        }
        trace!(%kc, "hotkey_removed");
        Ok(())
    }

    /// Remove every entry.
    pub fn remove_all(&self) -> Result<()> {
        self.check_mutate()?;
        self.shared.table.clear();
        Ok(())
    }

    /// Move the entry under `old` to `new`, keeping its callback and
    /// repeat flag. A no-op success when `old == new`.
    pub fn replace(&self, old: KeyCombination, new: KeyCombination) -> Result<()> {
        self.check_mutate()?;
        if !new.is_valid() {
            return Err(Error::InvalidValue);
        }
        if !self.shared.table.contains(&old) {
            return Err(Error::NotFound);
        }
        if old == new {
            return Ok(());
        }
        if self.shared.table.contains(&new) {
            return Err(Error::DuplicateEntry);
        }
        self.shared.table.rekey(&old, new);
        trace!(%old, %new, "hotkey_replaced");
        Ok(())
    }

    /// Change the repeat flag for `kc`.
    pub fn set_auto_repeat(&self, kc: KeyCombination, auto_repeat: bool) -> Result<()> {
        self.check_mutate()?;
        if !self.shared.table.set_auto_repeat(&kc, auto_repeat) {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// Set the debounce window; zero disables debouncing. Takes effect
    /// on the next processed event and may be called at any time.
    pub fn set_debounced_time(&self, window: Duration) {
        self.shared
            .debounce_ms
            .store(window.as_millis() as u64, Ordering::Relaxed);
    }

    /// Observe raw transitions of one key, independent of the
    /// combination table. At most one listener per (key, kind).
    pub fn add_key_listener(
        &self,
        key: Key,
        kind: KeyEventKind,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        self.check_mutate()?;
        let mut listeners = self.shared.key_listeners.lock();
        if listeners.contains_key(&(key, kind)) {
            return Err(Error::DuplicateEntry);
        }
        listeners.insert((key, kind), Arc::new(callback));
        Ok(())
    }

    /// Remove the raw listener for (key, kind).
    pub fn remove_key_listener(&self, key: Key, kind: KeyEventKind) -> Result<()> {
        self.check_mutate()?;
        if self.shared.key_listeners.lock().remove(&(key, kind)).is_none() {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    /// True when an entry exists for `kc`. Callable from any thread,
    /// including from a hotkey callback.
    pub fn has(&self, kc: KeyCombination) -> bool {
        self.shared.table.contains(&kc)
    }

    /// Tear down: stop the worker (which uninstalls the listener on
    /// itself), join it, and reset all state. Idempotent on a stopped
    /// manager; rejected with `WrongThread` from a callback.
    pub fn end(&self) -> Result<()> {
        // Claim the shutdown, then release the control lock so a
        // callback still running on the worker can take it and fail
        // fast instead of wedging the join below.
        let handle = {
            let mut control = self.control.lock();
            match control.state {
                RunState::Stopped => return Ok(()),
                _ if control.on_worker_thread() => return Err(Error::WrongThread),
                RunState::Stopping | RunState::Starting => return Ok(()),
                RunState::Running => {}
            }
            control.state = RunState::Stopping;
            control.worker.take()
        };

        self.shared.should_close.store(true, Ordering::Release);
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("hook_worker_panicked");
        }
        self.shared.table.clear();
        self.shared.key_listeners.lock().clear();

        let mut control = self.control.lock();
        control.worker_thread = None;
        control.state = RunState::Stopped;
        debug!("hook_manager_stopped");
        match self.shared.teardown.lock().take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Running-state and calling-thread checks shared by all mutating
    /// calls, in that order.
    fn check_mutate(&self) -> Result<()> {
        let control = self.control.lock();
        if control.state != RunState::Running {
            return Err(Error::WrongManagerState);
        }
        if control.on_worker_thread() {
            return Err(Error::WrongThread);
        }
        Ok(())
    }
}

impl Drop for HookManager {
    fn drop(&mut self) {
        if let Err(e) = self.end() {
            warn!(error = %e, "hook_manager_drop_teardown_failed");
        }
    }
}

/// Body of the dedicated worker thread.
fn run_worker(
    shared: &Shared,
    factory: &ListenerFactory,
    keymap: &dyn KeyMap,
    ready: &Sender<Result<()>>,
) {
    let mut backend = match factory() {
        Ok(backend) => backend,
        Err(e) => {
            warn!(error = %e, "listener_backend_create_failed");
            let _ = ready.send(Err(e));
            return;
        }
    };
    let (event_tx, event_rx): (Sender<RawKeyEvent>, Receiver<RawKeyEvent>) = unbounded();
    if let Err(e) = backend.install(event_tx) {
        warn!(error = %e, "listener_install_failed");
        let _ = ready.send(Err(e));
        return;
    }
    let _ = ready.send(Ok(()));
    debug!("hook_worker_running");

    let mut state = KeyState::new();
    let mut pacer = Pacer::new(shared.config.cycle);
    loop {
        pacer.begin_cycle();
        if shared.should_close.load(Ordering::Acquire) {
            break;
        }
        for _ in 0..shared.config.max_events_per_cycle {
            let Ok(event) = event_rx.try_recv() else {
                break;
            };
            handle_event(shared, keymap, &mut state, event);
        }
        pacer.sleep_remaining();
    }
    if let Err(e) = backend.uninstall() {
        warn!(error = %e, "listener_uninstall_failed");
        *shared.teardown.lock() = Some(e);
    }
    debug!("hook_worker_stopped");
}

/// Translate, track, and evaluate one raw transition.
fn handle_event(shared: &Shared, keymap: &dyn KeyMap, state: &mut KeyState, event: RawKeyEvent) {
    let Some(key) = keymap.from_native(event.code) else {
        trace!(code = event.code, "unmapped_native_code");
        return;
    };
    notify_key_listener(shared, key, event.pressed);

    let current = state.apply(key, event.pressed);
    let now = Instant::now();
    let window = Duration::from_millis(shared.debounce_ms.load(Ordering::Relaxed));
    let matched = current
        .combination()
        .and_then(|kc| shared.table.lookup(&kc));
    let decision = keystate::classify(
        window,
        state.since_last_eval(now),
        state.prev(),
        current,
        matched.as_ref().map(|(view, _)| *view),
    );
    if decision.fire
        && let Some((_, callback)) = matched
    {
        trace!(key = %key.name(), "hotkey_fired");
        callback();
    }
    if decision.evaluate {
        state.note_eval(current, now);
    }
}

/// Invoke the raw per-key observer for this transition, if any.
fn notify_key_listener(shared: &Shared, key: Key, pressed: bool) {
    let kind = if pressed {
        KeyEventKind::Pressed
    } else {
        KeyEventKind::Released
    };
    let callback = shared.key_listeners.lock().get(&(key, kind)).cloned();
    if let Some(callback) = callback {
        callback();
    }
}
