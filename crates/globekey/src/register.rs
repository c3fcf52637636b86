//! Manager that asks the operating system to own each hotkey.
//!
//! The native registration call binds a hotkey to the calling thread's
//! event queue, so every native mutation must run on the one thread
//! that also pumps activations. The manager spawns that thread on
//! `start` and serializes all mutations onto it through the
//! single-slot [`Dispatcher`]: a public call validates against the
//! locked callback table, submits a task, blocks for the worker's
//! result, and only then mutates the table. Activations resolve
//! through worker-confined id maps and invoke the entry's callback on
//! the worker thread.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use crossbeam_channel::{Sender, bounded};
use keycomb::KeyCombination;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    Error, Result,
    backend::{HotkeyId, RegistryBackend, RegistryFactory},
    table::{CallbackTable, HotkeyEntry},
    task::{Dispatcher, Task},
    worker::{Control, Pacer, RunState, WorkerConfig},
};

/// State shared between the facade and the worker thread.
struct Shared {
    dispatcher: Dispatcher,
    table: CallbackTable,
    should_close: AtomicBool,
    config: WorkerConfig,
}

/// Worker-confined id maps: always mutual inverses.
#[derive(Default)]
struct IdMaps {
    next: u32,
    by_id: HashMap<HotkeyId, KeyCombination>,
    by_kc: HashMap<KeyCombination, HotkeyId>,
}

impl IdMaps {
    fn insert(&mut self, id: HotkeyId, kc: KeyCombination) {
        self.by_id.insert(id, kc);
        self.by_kc.insert(kc, id);
    }

    fn remove(&mut self, id: HotkeyId, kc: &KeyCombination) {
        self.by_id.remove(&id);
        self.by_kc.remove(kc);
    }

    fn reset(&mut self) {
        self.by_id.clear();
        self.by_kc.clear();
        self.next = 0;
    }
}

/// Global hotkey manager backed by native OS registration.
///
/// Construct one instance per process (the composition root owns it)
/// and share it behind an `Arc`; every method takes `&self` and is
/// callable from any thread except, for mutations, the manager's own
/// worker thread. Restarting after a clean [`Self::end`] is allowed
/// and begins from empty state.
pub struct RegisterManager {
    shared: Arc<Shared>,
    factory: RegistryFactory,
    control: Mutex<Control>,
}

impl RegisterManager {
    /// Create a manager with default worker tuning. The factory runs
    /// on the worker thread at every `start`.
    pub fn new(factory: RegistryFactory) -> Self {
        Self::with_config(factory, WorkerConfig::default())
    }

    /// Create a manager with explicit worker tuning.
    pub fn with_config(factory: RegistryFactory, config: WorkerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                dispatcher: Dispatcher::new(),
                table: CallbackTable::default(),
                should_close: AtomicBool::new(false),
                config,
            }),
            factory,
            control: Mutex::new(Control::new()),
        }
    }

    /// Spawn the worker thread and begin processing. Idempotent: a
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
        self.shared.dispatcher.open();

        let (ready_tx, ready_rx) = bounded(1);
        let shared = Arc::clone(&self.shared);
        let factory = Arc::clone(&self.factory);
        let spawned = thread::Builder::new()
            .name("globekey-register".into())
            .spawn(move || run_worker(&shared, &factory, &ready_tx));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.dispatcher.close();
                control.state = RunState::Stopped;
                return Err(Error::WorkerStart(e.to_string()));
            }
        };
        match ready_rx.recv() {
            Ok(Ok(())) => {
                control.worker_thread = Some(handle.thread().id());
                control.worker = Some(handle);
                control.state = RunState::Running;
                debug!("register_manager_started");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                self.shared.dispatcher.close();
                control.state = RunState::Stopped;
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                self.shared.dispatcher.close();
                control.state = RunState::Stopped;
                Err(Error::WorkerStart(
                    "worker exited before signalling readiness".into(),
                ))
            }
        }
    }

    /// Register `kc` and invoke `callback` on every activation.
    ///
    /// With `auto_repeat` false, holding the key fires only once; the
    /// suppression is applied natively at registration time.
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
        self.shared.dispatcher.submit(Task::Add { kc, auto_repeat })?;
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

    /// Unregister `kc`. The table keeps its entry when the native
    /// release fails, since the OS still owns the registration.
    pub fn remove(&self, kc: KeyCombination) -> Result<()> {
        self.check_mutate()?;
        if !self.shared.table.contains(&kc) {
            return Err(Error::NotFound);
        }
        self.shared.dispatcher.submit(Task::Remove { kc })?;
        self.shared.table.remove(&kc);
        trace!(%kc, "hotkey_removed");
        Ok(())
    }

    /// Unregister everything, best-effort: a native failure does not
    /// stop the remaining releases; the last error seen is returned
    /// and the table is cleared either way.
    pub fn remove_all(&self) -> Result<()> {
        self.check_mutate()?;
        let result = self.shared.dispatcher.submit(Task::RemoveAll);
        if !matches!(result, Err(Error::WrongManagerState | Error::WrongThread)) {
            self.shared.table.clear();
        }
        result
    }

    /// Move the registration under `old` to `new`, keeping its native
    /// id and callback. A no-op success when `old == new`.
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
        self.shared.dispatcher.submit(Task::Replace { old, new })?;
        self.shared.table.rekey(&old, new);
        trace!(%old, %new, "hotkey_replaced");
        Ok(())
    }

    /// Change the repeat attribute for `kc`. Requires a native
    /// re-registration, which runs before the stored flag changes.
    pub fn set_auto_repeat(&self, kc: KeyCombination, auto_repeat: bool) -> Result<()> {
        self.check_mutate()?;
        if !self.shared.table.contains(&kc) {
            return Err(Error::NotFound);
        }
        self.shared
            .dispatcher
            .submit(Task::SetAutoRepeat { kc, auto_repeat })?;
        self.shared.table.set_auto_repeat(&kc, auto_repeat);
        Ok(())
    }

    /// True when an entry exists for `kc`. Callable from any thread,
    /// including from a hotkey callback.
    pub fn has(&self, kc: KeyCombination) -> bool {
        self.shared.table.contains(&kc)
    }

    /// Tear down: native unregistration of every hotkey on the worker
    /// thread, then an explicit join, then a full state reset.
    /// Idempotent on a stopped manager; rejected with `WrongThread`
    /// from a callback, where waiting on ourselves would deadlock.
    pub fn end(&self) -> Result<()> {
        // Claim the shutdown, then release the control lock: the
        // worker may be inside a callback that calls back into the
        // manager, and those calls must be able to take the lock and
        // fail fast instead of wedging the drain below.
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

        let result = self.shared.dispatcher.submit(Task::End);
        self.shared.should_close.store(true, Ordering::Release);
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            warn!("register_worker_panicked");
        }
        self.shared.dispatcher.close();
        self.shared.table.clear();

        let mut control = self.control.lock();
        control.worker_thread = None;
        control.state = RunState::Stopped;
        debug!("register_manager_stopped");
        result
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

impl Drop for RegisterManager {
    fn drop(&mut self) {
        if let Err(e) = self.end() {
            warn!(error = %e, "register_manager_drop_teardown_failed");
        }
    }
}

/// Body of the dedicated worker thread.
fn run_worker(shared: &Shared, factory: &RegistryFactory, ready: &Sender<Result<()>>) {
    let mut backend = match factory() {
        Ok(backend) => backend,
        Err(e) => {
            warn!(error = %e, "registry_backend_create_failed");
            let _ = ready.send(Err(e));
            return;
        }
    };
    shared.dispatcher.bind_worker(thread::current().id());
    let _ = ready.send(Ok(()));
    debug!("register_worker_running");

    let mut maps = IdMaps::default();
    let mut pacer = Pacer::new(shared.config.cycle);
    loop {
        pacer.begin_cycle();
        if shared.should_close.load(Ordering::Acquire) {
            break;
        }
        if let Some(task) = shared.dispatcher.poll() {
            let result = apply_task(shared, backend.as_mut(), &mut maps, task);
            if let Err(e) = &result {
                warn!(error = %e, ?task, "task_failed");
            }
            shared.dispatcher.complete(result);
        }
        pump_fired(shared, backend.as_mut(), &maps);
        pacer.sleep_remaining();
    }
    debug!("register_worker_stopped");
}

/// Execute one administrative task with thread-confined native calls.
fn apply_task(
    shared: &Shared,
    backend: &mut dyn RegistryBackend,
    maps: &mut IdMaps,
    task: Task,
) -> Result<()> {
    match task {
        Task::Add { kc, auto_repeat } => {
            // Re-check under worker serialization: two racing adds for
            // the same combination both pass the facade's check.
            if maps.by_kc.contains_key(&kc) {
                return Err(Error::DuplicateEntry);
            }
            let id = HotkeyId(maps.next);
            backend.register(id, &kc, auto_repeat)?;
            maps.next += 1;
            maps.insert(id, kc);
            trace!(%id, %kc, "native_registered");
            Ok(())
        }
        Task::Remove { kc } => {
            let id = *maps.by_kc.get(&kc).ok_or(Error::NotFound)?;
            backend.unregister(id)?;
            maps.remove(id, &kc);
            trace!(%id, %kc, "native_unregistered");
            Ok(())
        }
        Task::RemoveAll | Task::End => {
            let mut last = Ok(());
            for (&id, &kc) in &maps.by_id {
                if let Err(e) = backend.unregister(id) {
                    warn!(%id, %kc, error = %e, "native_unregister_failed");
                    last = Err(e);
                }
            }
            maps.reset();
            last
        }
        Task::Replace { old, new } => {
            let id = *maps.by_kc.get(&old).ok_or(Error::NotFound)?;
            let auto_repeat = shared.table.auto_repeat(&old).unwrap_or(false);
            backend.unregister(id)?;
            maps.remove(id, &old);
            match backend.register(id, &new, auto_repeat) {
                Ok(()) => {
                    maps.insert(id, new);
                    trace!(%id, %old, %new, "native_replaced");
                    Ok(())
                }
                Err(e) => {
                    // Restore the previous registration so native state
                    // keeps matching the table, which stays keyed on
                    // `old`.
                    match backend.register(id, &old, auto_repeat) {
                        Ok(()) => maps.insert(id, old),
                        Err(re) => warn!(%id, %old, error = %re, "native_rollback_failed"),
                    }
                    Err(e)
                }
            }
        }
        Task::SetAutoRepeat { kc, auto_repeat } => {
            let id = *maps.by_kc.get(&kc).ok_or(Error::NotFound)?;
            backend.unregister(id)?;
            match backend.register(id, &kc, auto_repeat) {
                Ok(()) => Ok(()),
                Err(e) => {
                    let prev = shared.table.auto_repeat(&kc).unwrap_or(false);
                    if let Err(re) = backend.register(id, &kc, prev) {
                        warn!(%id, %kc, error = %re, "native_rollback_failed");
                        maps.remove(id, &kc);
                    }
                    Err(e)
                }
            }
        }
    }
}

/// Drain a bounded batch of activations and invoke their callbacks.
fn pump_fired(shared: &Shared, backend: &mut dyn RegistryBackend, maps: &IdMaps) {
    for _ in 0..shared.config.max_events_per_cycle {
        let Some(id) = backend.next_fired() else {
            break;
        };
        let Some(kc) = maps.by_id.get(&id) else {
            trace!(%id, "activation_for_unknown_id");
            continue;
        };
        // Clone the callback out of the table lock; the callback may
        // call back into the manager (e.g. `has`).
        let Some(callback) = shared.table.callback(kc) else {
            continue;
        };
        trace!(%id, %kc, "hotkey_fired");
        callback();
    }
}
