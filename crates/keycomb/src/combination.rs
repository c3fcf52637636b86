use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Key, Modifiers};

/// A hotkey combination: a non-empty modifier set plus one primary key.
///
/// Equality and hashing use both fields, so a combination can key a
/// map directly. Values are `Copy` and carry no ownership concerns.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct KeyCombination {
    /// Modifier bits that must be held.
    pub modifiers: Modifiers,
    /// The non-modifier key that completes the combination.
    pub key: Key,
}

impl KeyCombination {
    /// Create a combination from parts.
    pub fn new(modifiers: Modifiers, key: Key) -> Self {
        Self { modifiers, key }
    }

    /// A combination is valid when at least one modifier bit is set and
    /// the primary key is not itself a modifier key.
    pub fn is_valid(self) -> bool {
        !self.modifiers.is_empty() && !self.key.is_modifier()
    }

    /// Parses a combination specification of the form `"ctrl+shift+j"`.
    ///
    /// - Case-insensitive; components are separated by `+`.
    /// - The last component is the primary key spec; every earlier
    ///   component must name a modifier key (aliases like cmd/win/opt
    ///   are accepted).
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts: Vec<&str> = s.split('+').collect();
        let key_raw = parts.pop()?;
        let key = if key_raw == " " {
            Key::Space
        } else {
            Key::from_spec(key_raw.trim())?
        };
        let mut modifiers = Modifiers::empty();
        for part in parts {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                return None;
            }
            let bit = Key::from_spec(trimmed)?.modifier_bit()?;
            modifiers.insert(bit);
        }
        Some(Self { modifiers, key })
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key.to_spec())
        } else {
            write!(f, "{}+{}", self.modifiers, self.key.to_spec())
        }
    }
}

// Serialized as the canonical spec string, so combinations read
// naturally in configuration files.
impl Serialize for KeyCombination {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KeyCombination {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid key combination '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_combination() {
        let kc = KeyCombination::parse("shift+ctrl+j").expect("parse");
        assert!(kc.modifiers.contains(Modifiers::SHIFT));
        assert!(kc.modifiers.contains(Modifiers::CTRL));
        assert_eq!(kc.key, Key::J);
        // Canonical order and lowercase specs on display.
        assert_eq!(kc.to_string(), "ctrl+shift+j");
    }

    #[test]
    fn parse_aliases_and_digits() {
        let kc = KeyCombination::parse("cmd+1").expect("parse");
        assert_eq!(kc.modifiers, Modifiers::META);
        assert_eq!(kc.key, Key::Digit1);
        assert_eq!(kc.to_string(), "meta+1");

        let kc = KeyCombination::parse("CTRL+ALT+Space").expect("parse");
        assert_eq!(kc.modifiers, Modifiers::CTRL | Modifiers::ALT);
        assert_eq!(kc.key, Key::Space);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(KeyCombination::parse(""), None);
        assert_eq!(KeyCombination::parse("ctrl++j"), None);
        assert_eq!(KeyCombination::parse("j+ctrl"), None);
        assert_eq!(KeyCombination::parse("ctrl+bogus"), None);
    }

    #[test]
    fn validity() {
        assert!(KeyCombination::parse("ctrl+j").expect("parse").is_valid());
        // No modifiers: parseable but not valid for registration.
        let bare = KeyCombination::parse("j").expect("parse");
        assert!(!bare.is_valid());
        // A modifier as the primary key is not valid either.
        let shift = KeyCombination::new(Modifiers::CTRL, Key::Shift);
        assert!(!shift.is_valid());
    }

    #[test]
    fn roundtrip_idempotence() {
        for spec in ["ctrl+shift+j", "meta+alt+space", "CTRL+F5", "shift+pgdn"] {
            let kc = KeyCombination::parse(spec).expect("parse");
            let emitted = kc.to_string();
            let back = KeyCombination::parse(&emitted).expect("reparse");
            assert_eq!(kc, back, "idempotent for {spec} => {emitted}");
        }
    }

    #[test]
    fn serde_uses_spec_string() {
        let kc = KeyCombination::parse("ctrl+shift+j").expect("parse");
        let json = serde_json::to_string(&kc).expect("serialize");
        assert_eq!(json, "\"ctrl+shift+j\"");
        let back: KeyCombination = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, kc);
        assert!(serde_json::from_str::<KeyCombination>("\"nope\"").is_err());
    }
}
