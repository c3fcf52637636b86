//! globekey: global hotkey management engine.
//!
//! Two managers cover the two strategies for system-wide shortcuts:
//!
//! - [`RegisterManager`] asks the operating system to own each hotkey
//!   through a [`RegistryBackend`]. Native registration binds to the
//!   worker thread's event queue, so all native mutations are
//!   serialized onto that thread through a single-slot task
//!   dispatcher; public methods remain callable from any other thread.
//! - [`HookManager`] installs a low-level keyboard listener through a
//!   [`ListenerBackend`] and matches combinations itself, with
//!   debounced key-state tracking and auto-repeat suppression.
//!
//! Both invoke callbacks on their worker thread, so two callbacks
//! never run concurrently with each other or with an administrative
//! operation. Backends are trait implementations supplied by platform
//! crates; the [`testing`] module ships scriptable in-memory fakes.
//! Key combinations and the numeric translation seam live in the
//! `keycomb` crate.

mod backend;
mod error;
mod hook;
mod keystate;
mod register;
mod table;
mod task;
pub mod testing;
mod worker;

pub use backend::{
    HotkeyId, ListenerBackend, ListenerFactory, RawKeyEvent, RegistryBackend, RegistryFactory,
};
pub use error::{Error, Result};
pub use hook::{DEFAULT_DEBOUNCE_MS, HookManager, KeyEventKind};
pub use register::RegisterManager;
pub use table::HotkeyCallback;
pub use worker::WorkerConfig;
