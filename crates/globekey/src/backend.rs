//! Native integration seams.
//!
//! The engine never issues OS calls itself; platform crates (or the
//! fakes in [`crate::testing`]) implement these traits. Both backends
//! are constructed by a factory closure *on the worker thread* and
//! never leave it: native hotkey registration binds to the calling
//! thread's event queue on at least one platform, so the types need
//! not be `Send`.

use std::{fmt, sync::Arc};

use crossbeam_channel::Sender;
use keycomb::KeyCombination;

use crate::Result;

/// Identifier assigned to a native registration.
///
/// Ids are assigned monotonically from zero by the worker and reused
/// only across a full stop or `remove_all`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct HotkeyId(
    /// The raw numeric id passed to the native registration call.
    pub u32,
);

impl fmt::Display for HotkeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A raw key transition as delivered by the platform listener.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RawKeyEvent {
    /// Platform key code; translated via [`keycomb::KeyMap`].
    pub code: i32,
    /// True for press (including OS auto-repeat), false for release.
    pub pressed: bool,
}

/// OS-owned hotkey registration primitives.
pub trait RegistryBackend {
    /// Register `kc` under `id`. `auto_repeat` maps to the platform's
    /// repeat-suppression attribute where one exists.
    fn register(&mut self, id: HotkeyId, kc: &KeyCombination, auto_repeat: bool) -> Result<()>;

    /// Release the registration held under `id`.
    fn unregister(&mut self, id: HotkeyId) -> Result<()>;

    /// Drain one pending activation, if any. Must not block; the
    /// worker calls this in a bounded batch every cycle.
    fn next_fired(&mut self) -> Option<HotkeyId>;
}

/// Low-level keyboard listener primitives.
pub trait ListenerBackend {
    /// Install the listener and deliver every key transition to
    /// `sink` until uninstalled.
    fn install(&mut self, sink: Sender<RawKeyEvent>) -> Result<()>;

    /// Remove the listener and stop event delivery.
    fn uninstall(&mut self) -> Result<()>;
}

/// Factory invoked on the worker thread to construct the registry.
pub type RegistryFactory = Arc<dyn Fn() -> Result<Box<dyn RegistryBackend>> + Send + Sync>;

/// Factory invoked on the worker thread to construct the listener.
pub type ListenerFactory = Arc<dyn Fn() -> Result<Box<dyn ListenerBackend>> + Send + Sync>;
