//! Cross-thread task dispatch onto the worker thread.
//!
//! Every mutation of native registration state must run on the one
//! thread that owns the native resource. The [`Dispatcher`] is a
//! single-slot request/response channel: any other thread deposits one
//! [`Task`] and blocks until the worker has executed it and posted the
//! result. Concurrent submitters serialize on the slot.

use std::{
    mem,
    thread::{self, ThreadId},
};

use keycomb::KeyCombination;
use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::{Error, Result};

/// An administrative operation to run on the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    /// Register a combination natively.
    Add {
        /// Combination to register.
        kc: KeyCombination,
        /// Whether OS auto-repeat should re-fire the hotkey.
        auto_repeat: bool,
    },
    /// Release one native registration.
    Remove {
        /// Combination to release.
        kc: KeyCombination,
    },
    /// Release every native registration and reset id assignment.
    RemoveAll,
    /// Re-key a registration, keeping its native id.
    Replace {
        /// Currently registered combination.
        old: KeyCombination,
        /// Combination to register in its place.
        new: KeyCombination,
    },
    /// Re-register a combination with a different repeat attribute.
    SetAutoRepeat {
        /// Combination to update.
        kc: KeyCombination,
        /// New repeat attribute.
        auto_repeat: bool,
    },
    /// Run native teardown ahead of worker shutdown.
    End,
}

/// Lifecycle of the single slot.
enum SlotState {
    /// No task anywhere in flight.
    Idle,
    /// A task is deposited and not yet picked up.
    Pending(Task),
    /// The worker took the task and is executing it.
    Busy,
    /// The worker posted a result the submitter has not consumed yet.
    Done(Result<()>),
}

struct Slot {
    state: SlotState,
    /// False while the manager is stopped; submissions are rejected.
    open: bool,
    /// Thread id of the bound worker, used to reject self-submission.
    worker: Option<ThreadId>,
}

/// Single-slot, blocking request/response channel to the worker thread.
pub(crate) struct Dispatcher {
    slot: Mutex<Slot>,
    /// Signaled when the slot returns to `Idle`.
    slot_free: Condvar,
    /// Signaled when a result is posted (or the dispatcher closes).
    task_done: Condvar,
}

impl Dispatcher {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: SlotState::Idle,
                open: false,
                worker: None,
            }),
            slot_free: Condvar::new(),
            task_done: Condvar::new(),
        }
    }

    /// Accept submissions. Called before the worker thread spawns, so
    /// binding the worker id happens later via [`Self::bind_worker`].
    pub(crate) fn open(&self) {
        let mut slot = self.slot.lock();
        slot.state = SlotState::Idle;
        slot.open = true;
        slot.worker = None;
    }

    /// Record the worker thread so its own submissions can be rejected.
    pub(crate) fn bind_worker(&self, id: ThreadId) {
        self.slot.lock().worker = Some(id);
    }

    /// Stop accepting submissions and release every waiter.
    ///
    /// A task still in the slot is completed with `WrongManagerState`
    /// so a submitter that raced past the facade's state check is never
    /// left blocked on a worker that no longer polls.
    pub(crate) fn close(&self) {
        let mut slot = self.slot.lock();
        slot.open = false;
        slot.worker = None;
        if matches!(slot.state, SlotState::Pending(_) | SlotState::Busy) {
            slot.state = SlotState::Done(Err(Error::WrongManagerState));
        }
        self.task_done.notify_all();
        self.slot_free.notify_all();
    }

    /// Deposit `task` and block until the worker posts its result.
    ///
    /// Callable from any thread except the bound worker thread, which
    /// is rejected with `WrongThread` instead of deadlocking on itself.
    pub(crate) fn submit(&self, task: Task) -> Result<()> {
        let mut slot = self.slot.lock();
        if slot.worker == Some(thread::current().id()) {
            return Err(Error::WrongThread);
        }
        // The open check must re-run on every wake and again right
        // before depositing: a task placed into a closed slot would
        // never be completed.
        loop {
            if !slot.open {
                return Err(Error::WrongManagerState);
            }
            if matches!(slot.state, SlotState::Idle) {
                break;
            }
            self.slot_free.wait(&mut slot);
        }
        trace!(?task, "task_submitted");
        slot.state = SlotState::Pending(task);
        loop {
            self.task_done.wait(&mut slot);
            if matches!(slot.state, SlotState::Done(_)) {
                let SlotState::Done(result) = mem::replace(&mut slot.state, SlotState::Idle) else {
                    unreachable!()
                };
                self.slot_free.notify_one();
                return result;
            }
            if !slot.open {
                return Err(Error::WrongManagerState);
            }
        }
    }

    /// Take the pending task, if any. Worker-only; never blocks.
    pub(crate) fn poll(&self) -> Option<Task> {
        let mut slot = self.slot.lock();
        if matches!(slot.state, SlotState::Pending(_)) {
            let SlotState::Pending(task) = mem::replace(&mut slot.state, SlotState::Busy) else {
                unreachable!()
            };
            Some(task)
        } else {
            None
        }
    }

    /// Post the result for the task taken by the last [`Self::poll`].
    pub(crate) fn complete(&self, result: Result<()>) {
        let mut slot = self.slot.lock();
        if matches!(slot.state, SlotState::Busy) {
            slot.state = SlotState::Done(result);
            self.task_done.notify_all();
        } else {
            trace!("task_completed_without_waiter");
        }
    }
}
