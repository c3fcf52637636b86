//! keycomb: portable key combination value types.
//!
//! - [`Key`]: enum of recognized keys with portable numeric codes and
//!   spec helpers (`Key::from_spec`, `Key::to_spec`).
//! - [`Modifiers`]: bitset of the four modifier families (Meta, Ctrl,
//!   Alt, Shift). Left/right/generic variants of a modifier key all
//!   normalize to one bit.
//! - [`KeyCombination`]: a modifier set plus one primary key, with
//!   `parse`/`Display` in the `"ctrl+shift+j"` form.
//! - [`KeyMap`]: the numeric translation seam between portable codes
//!   and whatever the platform's raw key codes are.

mod key;
pub use key::Key;

mod modifiers;
pub use modifiers::Modifiers;

mod combination;
pub use combination::KeyCombination;

mod keymap;
pub use keymap::{IdentityKeyMap, KeyMap};
