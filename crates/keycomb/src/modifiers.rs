use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Bitset of the four modifier families.
    ///
    /// Matching works on families: left, right, and generic variants of
    /// a modifier key (see [`crate::Key::modifier_bit`]) all set the
    /// same bit here.
    #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
    pub struct Modifiers: u32 {
        /// Windows / Command / Super family.
        const META = 1 << 0;
        /// Control family.
        const CTRL = 1 << 1;
        /// Alt / Option family.
        const ALT = 1 << 2;
        /// Shift family.
        const SHIFT = 1 << 3;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

impl Modifiers {
    // Canonical display and spec order.
    const ORDERED: [(Self, &'static str); 4] = [
        (Self::META, "meta"),
        (Self::CTRL, "ctrl"),
        (Self::ALT, "alt"),
        (Self::SHIFT, "shift"),
    ];

    /// The canonical spec words for the set bits, in canonical order.
    pub fn spec_words(self) -> Vec<&'static str> {
        Self::ORDERED
            .iter()
            .filter(|(bit, _)| self.contains(*bit))
            .map(|(_, word)| *word)
            .collect()
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spec_words().join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_canonical_order() {
        let m = Modifiers::SHIFT | Modifiers::CTRL;
        assert_eq!(m.to_string(), "ctrl+shift");
        assert_eq!(Modifiers::all().to_string(), "meta+ctrl+alt+shift");
        assert_eq!(Modifiers::empty().to_string(), "");
    }

    #[test]
    fn subset_containment() {
        let all = Modifiers::all();
        let cs = Modifiers::CTRL | Modifiers::SHIFT;
        assert!(all.contains(cs));
        assert!(!cs.contains(all));
        assert!(cs.contains(Modifiers::empty()));
    }
}
